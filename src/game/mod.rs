use log::{debug, info};
use std::mem;
use std::path::Path;

use crate::config::EngineConfig;
use crate::ecs::system::System;
use crate::ecs::world::World;
use crate::error::Result;
use crate::render::RenderFrame;
use crate::save::LevelLoadReport;

/// Drives a world: the animation tick, the frame tick and scene changes
pub struct Game {
    world: World,
    systems: Vec<Box<dyn System>>,
    paused: bool,
    changing_scene: bool,
    frames: u64,
}

/// Counters collected by [`Game::run_for`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub animation_ticks: u64,
    pub frames: u64,
    pub drawn: usize,
}

impl Game {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            world: World::new(config),
            systems: Vec::new(),
            paused: false,
            changing_scene: false,
            frames: 0,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Add a gameplay system, systems run in insertion order
    pub fn add_system<S: System + 'static>(&mut self, system: S) {
        info!("System {} added", system.name());
        self.systems.push(Box::new(system));
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn unpause(&mut self) {
        self.paused = false;
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_changing_scene(&self) -> bool {
        self.changing_scene
    }

    /// Number of frame ticks run so far
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Advance every playing animation by one animation interval
    pub fn animation_tick(&mut self) -> bool {
        if self.paused || self.changing_scene {
            return false;
        }
        let tick_ms = self.world.config().animation_tick_ms;
        self.world.run_animations(tick_ms);
        true
    }

    /// Run deferred tasks, the systems, and build the frame to draw
    pub fn frame_tick(&mut self, delta_ms: u64) -> Option<RenderFrame> {
        if self.changing_scene {
            return None;
        }

        let ran = self.world.run_deferred_tasks(delta_ms);
        if ran > 0 {
            debug!("{ran} deferred tasks ran");
        }

        if !self.paused {
            // Systems borrow the world mutably, so take them out for the call
            let mut systems = mem::take(&mut self.systems);
            for system in systems.iter_mut() {
                system.update(&mut self.world, delta_ms);
            }
            for system in systems.iter_mut() {
                system.late_update(&mut self.world, delta_ms);
            }
            self.systems = systems;
        }

        self.frames += 1;
        Some(self.world.render_frame())
    }

    /// Simulate `total_ms` of game time, interleaving both ticks at their
    /// configured intervals
    pub fn run_for(&mut self, total_ms: u64) -> RunSummary {
        let animation_every = self.world.config().animation_tick_ms.max(1);
        let frame_every = self.world.config().frame_tick_ms.max(1);

        let mut summary = RunSummary::default();
        let mut next_animation = animation_every;
        let mut next_frame = frame_every;
        let mut last_frame = 0;

        loop {
            let now = next_animation.min(next_frame);
            if now > total_ms {
                break;
            }

            if next_animation == now {
                if self.animation_tick() {
                    summary.animation_ticks += 1;
                }
                next_animation += animation_every;
            }
            if next_frame == now {
                if let Some(frame) = self.frame_tick(now - last_frame) {
                    summary.frames += 1;
                    summary.drawn = frame.len();
                }
                last_frame = now;
                next_frame += frame_every;
            }
        }
        summary
    }

    /// Destroy every entity and empty every registry
    pub fn clear_scene(&mut self) {
        self.changing_scene = true;
        self.world.clear();
        self.changing_scene = false;
        info!("Scene cleared");
    }

    /// Load every entity file of a level directory into the current scene
    pub fn load_level<P: AsRef<Path>>(&mut self, dir: P) -> Result<LevelLoadReport> {
        self.changing_scene = true;
        let report = self.world.load_level(dir);
        self.changing_scene = false;
        report
    }

    pub fn save_level<P: AsRef<Path>>(&self, dir: P) -> Result<usize> {
        self.world.save_level(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Animation, AnimationFrame, Animator};
    use crate::ecs::component::{Sprite, Transform};
    use crate::math::Vector2;

    struct CountingSystem {
        updates: u32,
        late_updates: u32,
    }

    impl System for CountingSystem {
        fn update(&mut self, world: &mut World, _delta_ms: u64) {
            self.updates += 1;
            if let Some(id) = world.lookup("Mover") {
                if let Some(transform) = world.get_component_mut::<Transform>(id) {
                    transform.position += Vector2::RIGHT;
                }
            }
        }

        fn late_update(&mut self, _world: &mut World, _delta_ms: u64) {
            self.late_updates += 1;
        }

        fn name(&self) -> &str {
            "CountingSystem"
        }
    }

    fn game_with_animation() -> (Game, crate::ecs::component::ComponentHandle) {
        let mut game = Game::new(EngineConfig::default());
        let world = game.world_mut();
        let id = world
            .spawn(
                "Mover",
                true,
                vec![Transform::at(Vector2::ZERO).into(), Sprite::new("a_0.png").into()],
            )
            .unwrap();
        let animation = Animation::new(
            "walk",
            vec![AnimationFrame::new("a_0.png", 100), AnimationFrame::new("a_1.png", 100)],
        );
        let animator = world
            .add_component(id, Animator::new(1.0).with_animation(animation))
            .unwrap();
        world.play_animation(animator, "walk").unwrap();
        (game, animator)
    }

    #[test]
    fn test_pause_suspends_systems_and_animation() {
        let (mut game, animator) = game_with_animation();
        game.add_system(CountingSystem {
            updates: 0,
            late_updates: 0,
        });

        game.pause();
        assert!(!game.animation_tick());
        assert!(game.frame_tick(16).is_some());
        let id = game.world().lookup("Mover").unwrap();
        assert_eq!(game.world().entity(id).unwrap().transform().unwrap().position, Vector2::ZERO);

        assert!(!game.toggle_pause());
        game.frame_tick(16);
        assert_eq!(
            game.world().entity(id).unwrap().transform().unwrap().position,
            Vector2::RIGHT
        );

        for _ in 0..11 {
            game.animation_tick();
        }
        let frame = game
            .world()
            .get::<Animator>(animator)
            .and_then(Animator::current_animation)
            .map(Animation::current_frame);
        assert_eq!(frame, Some(1));
    }

    #[test]
    fn test_run_for_interleaves_ticks() {
        let (mut game, _) = game_with_animation();
        let summary = game.run_for(160);
        assert_eq!(summary.animation_ticks, 16);
        assert_eq!(summary.frames, 10);
        assert_eq!(summary.drawn, 1);
        assert_eq!(game.frame_count(), 10);
        assert_eq!(game.world().tasks().now_ms(), 160);
    }

    #[test]
    fn test_clear_scene_empties_world() {
        let (mut game, _) = game_with_animation();
        game.clear_scene();

        assert!(!game.is_changing_scene());
        assert_eq!(game.world().entity_count(), 0);
        assert!(game.world().animations().is_empty());
        assert!(game.frame_tick(16).unwrap().is_empty());
    }
}
