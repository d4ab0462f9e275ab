//! Frame animations and the scheduler that advances them

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ecs::component::{ComponentHandle, ComponentId, ImageRef, Sprite};
use crate::ecs::world::World;
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationFrame {
    pub image: ImageRef,
    /// How long the frame stays on screen
    pub duration_ms: u32,
}

impl AnimationFrame {
    pub fn new<S: Into<String>>(image: S, duration_ms: u32) -> Self {
        Self {
            image: ImageRef::new(image),
            duration_ms,
        }
    }
}

/// Playback position inside an animation
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct AnimationCursor {
    elapsed_ms: f64,
    threshold_ms: f64,
    frame: usize,
}

/// Outcome of advancing an animation by one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStep {
    Hold,
    Show(usize),
    Finished,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Animation {
    pub name: String,
    pub frames: Vec<AnimationFrame>,
    #[serde(rename = "loop", default = "default_looping")]
    pub looping: bool,
    #[serde(skip)]
    cursor: AnimationCursor,
    /// Sprite whose image is swapped on every frame change
    #[serde(skip)]
    sprite: Option<ComponentId>,
}

fn default_looping() -> bool {
    true
}

impl Animation {
    pub fn new<S: Into<String>>(name: S, frames: Vec<AnimationFrame>) -> Self {
        let mut animation = Self {
            name: name.into(),
            frames,
            looping: true,
            cursor: AnimationCursor::default(),
            sprite: None,
        };
        animation.rewind();
        animation
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn current_frame(&self) -> usize {
        self.cursor.frame
    }

    pub fn bound_sprite(&self) -> Option<ComponentId> {
        self.sprite
    }

    fn show(&mut self, frame: usize) {
        self.cursor = AnimationCursor {
            elapsed_ms: 0.0,
            threshold_ms: self.frames.get(frame).map_or(0.0, |f| f.duration_ms as f64),
            frame,
        };
    }

    pub fn rewind(&mut self) {
        self.show(0);
    }

    /// Accumulate `delta_ms` and move on once the current frame has been
    /// shown for longer than its duration
    pub fn advance(&mut self, delta_ms: f64) -> FrameStep {
        if self.frames.is_empty() {
            return FrameStep::Finished;
        }

        self.cursor.elapsed_ms += delta_ms;
        if self.cursor.elapsed_ms <= self.cursor.threshold_ms {
            return FrameStep::Hold;
        }

        let next = self.cursor.frame + 1;
        if next < self.frames.len() {
            self.show(next);
            FrameStep::Show(next)
        } else if self.looping {
            self.show(0);
            FrameStep::Show(0)
        } else {
            FrameStep::Finished
        }
    }
}

/// Component holding named animations, at most one of them playing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "AnimatorDocument", into = "AnimatorDocument")]
pub struct Animator {
    animations: BTreeMap<String, Animation>,
    playback_speed: f32,
    current: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnimatorDocument {
    animations: Vec<Animation>,
    #[serde(default = "default_playback_speed")]
    playback_speed: f32,
}

fn default_playback_speed() -> f32 {
    1.0
}

impl From<AnimatorDocument> for Animator {
    fn from(document: AnimatorDocument) -> Self {
        let mut animator = Animator::new(document.playback_speed);
        for animation in document.animations {
            animator.add_animation(animation);
        }
        animator
    }
}

impl From<Animator> for AnimatorDocument {
    fn from(animator: Animator) -> Self {
        Self {
            animations: animator.animations.into_values().collect(),
            playback_speed: animator.playback_speed,
        }
    }
}

impl Animator {
    /// Create an animator, negative speeds are clamped to zero
    pub fn new(playback_speed: f32) -> Self {
        Self {
            animations: BTreeMap::new(),
            playback_speed: playback_speed.max(0.0),
            current: None,
        }
    }

    pub fn with_animation(mut self, animation: Animation) -> Self {
        self.add_animation(animation);
        self
    }

    /// Add an animation, replacing any animation with the same name
    pub fn add_animation(&mut self, animation: Animation) {
        if self.animations.contains_key(&animation.name) {
            warn!("Animation \"{}\" replaced", animation.name);
        }
        self.animations.insert(animation.name.clone(), animation);
    }

    pub fn animation(&self, name: &str) -> Option<&Animation> {
        self.animations.get(name)
    }

    pub fn animations(&self) -> impl Iterator<Item = &Animation> {
        self.animations.values()
    }

    pub fn playback_speed(&self) -> f32 {
        self.playback_speed
    }

    pub fn set_playback_speed(&mut self, playback_speed: f32) {
        self.playback_speed = playback_speed.max(0.0);
    }

    pub fn is_playing(&self) -> bool {
        self.current.is_some()
    }

    /// Name of the animation currently playing
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current_animation(&self) -> Option<&Animation> {
        self.animations.get(self.current.as_deref()?)
    }

    pub(crate) fn stop_playing(&mut self) -> Option<String> {
        self.current.take()
    }
}

/// Animators with an animation playing, advanced on every animation tick
#[derive(Debug, Default)]
pub struct AnimationScheduler {
    running: Vec<ComponentHandle>,
}

impl AnimationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn schedule(&mut self, animator: ComponentHandle) {
        if !self.running.contains(&animator) {
            self.running.push(animator);
        }
    }

    pub(crate) fn unschedule(&mut self, animator: ComponentHandle) {
        self.running.retain(|h| *h != animator);
    }

    /// Copy of the running list, safe to iterate while animations stop
    pub fn snapshot(&self) -> Vec<ComponentHandle> {
        self.running.clone()
    }

    pub fn contains(&self, animator: ComponentHandle) -> bool {
        self.running.contains(&animator)
    }

    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.running.clear();
    }
}

enum TickOutcome {
    Idle,
    Swap(Option<ComponentId>, ImageRef),
    Finished,
}

impl World {
    fn animator_not_found(&self, animator: ComponentHandle) -> EngineError {
        EngineError::ComponentNotFound {
            entity: self.entity_label(animator.entity),
            component: format!("Animator #{}", animator.component),
        }
    }

    /// Start the named animation on an Animator, stopping whatever it played
    pub fn play_animation(&mut self, animator: ComponentHandle, name: &str) -> Result<()> {
        let Some(entity) = self.entities.get(&animator.entity) else {
            let err = EngineError::EntityNotFound(format!("#{}", animator.entity));
            error!("Animation {name} couldn't be played: {err}");
            return Err(err);
        };
        let sprite = entity.component_id::<Sprite>();
        let Some(state) = entity
            .component(animator.component)
            .and_then(|c| c.view::<Animator>())
        else {
            let err = self.animator_not_found(animator);
            error!("Animation {name} couldn't be played: {err}");
            return Err(err);
        };

        match state.animation(name) {
            None => {
                let err = EngineError::AnimationNotFound(name.to_string());
                error!("Animation {name} not found and couldn't be played");
                return Err(err);
            }
            Some(animation) if animation.frames.is_empty() => {
                let err = EngineError::Malformed(format!("animation \"{name}\" has no frames"));
                error!("{err}");
                return Err(err);
            }
            Some(_) => {}
        }

        if state.is_playing() {
            self.stop_animation(animator)?;
        }
        if sprite.is_none() {
            warn!(
                "Entity \"{}\" has no Sprite, animation {name} plays without a visual",
                self.entity_label(animator.entity)
            );
        }

        let Some(state) = self.get_mut::<Animator>(animator) else {
            return Err(self.animator_not_found(animator));
        };
        let Some(animation) = state.animations.get_mut(name) else {
            return Err(EngineError::AnimationNotFound(name.to_string()));
        };
        animation.rewind();
        animation.sprite = sprite;
        let first = animation.frames[0].image.clone();
        state.current = Some(name.to_string());

        if let Some(sprite) = sprite {
            if let Some(target) = self.get_mut::<Sprite>(ComponentHandle::new(animator.entity, sprite)) {
                target.image = first;
            }
        }
        self.animations.schedule(animator);
        info!(
            "Animation {name} started on entity \"{}\"",
            self.entity_label(animator.entity)
        );
        Ok(())
    }

    /// Stop the animation currently playing on an Animator
    pub fn stop_animation(&mut self, animator: ComponentHandle) -> Result<()> {
        let label = self.entity_label(animator.entity);
        let Some(state) = self.get_mut::<Animator>(animator) else {
            let err = self.animator_not_found(animator);
            error!("{err}");
            return Err(err);
        };

        match state.stop_playing() {
            Some(name) => {
                self.animations.unschedule(animator);
                debug!("Animation {name} stopped on entity \"{label}\"");
                Ok(())
            }
            None => {
                let err = EngineError::NotPlaying(label);
                error!("Trying to stop animator that isn't playing: {err}");
                Err(err)
            }
        }
    }

    /// Advance every playing animation by one tick
    pub fn run_animations(&mut self, tick_ms: u64) {
        for handle in self.animations.snapshot() {
            let outcome = match self.component_mut(handle) {
                None => {
                    self.animations.unschedule(handle);
                    continue;
                }
                Some(component) if !component.enabled => TickOutcome::Idle,
                Some(component) => match component.view_mut::<Animator>() {
                    Some(state) => Self::tick_animator(state, tick_ms),
                    None => TickOutcome::Idle,
                },
            };

            match outcome {
                TickOutcome::Idle => {}
                TickOutcome::Swap(sprite, image) => {
                    let Some(sprite) = sprite else { continue };
                    if let Some(target) =
                        self.get_mut::<Sprite>(ComponentHandle::new(handle.entity, sprite))
                    {
                        debug!("Frame swap to {}", image.path());
                        target.image = image;
                    }
                }
                TickOutcome::Finished => {
                    let _ = self.stop_animation(handle);
                }
            }
        }
    }

    fn tick_animator(state: &mut Animator, tick_ms: u64) -> TickOutcome {
        let delta = tick_ms as f64 * state.playback_speed as f64;
        let Some(name) = state.current.as_deref() else {
            return TickOutcome::Idle;
        };
        let Some(animation) = state.animations.get_mut(name) else {
            return TickOutcome::Idle;
        };

        match animation.advance(delta) {
            FrameStep::Hold => TickOutcome::Idle,
            FrameStep::Show(frame) => {
                TickOutcome::Swap(animation.sprite, animation.frames[frame].image.clone())
            }
            FrameStep::Finished => TickOutcome::Finished,
        }
    }
}
