use stc_engine::ecs::{ComponentType, InteractionSystem, PickupSystem, Transform};
use stc_engine::inventory::{DroppedItem, Inventory, ItemStack};
use stc_engine::{ComponentHandle, EngineConfig, Game, Vector2};

fn game_with_chest() -> (Game, ComponentHandle, ComponentHandle) {
    let mut game = Game::new(EngineConfig::default());
    game.add_system(PickupSystem::new());
    game.add_system(InteractionSystem::new());

    let world = game.world_mut();
    let player = world
        .spawn("Player", true, vec![Transform::at(Vector2::ZERO).into()])
        .expect("player spawns");
    let player_inventory = world
        .add_component(player, Inventory::new(true))
        .expect("player inventory");

    let chest = world
        .spawn(
            "Chest",
            true,
            vec![
                Transform::at(Vector2::new(5.0, 0.0)).into(),
                Inventory::new(false)
                    .with_items(vec![
                        ItemStack::new("Coin", 12, "coin.png"),
                        ItemStack::new("Key", 1, "key.png"),
                    ])
                    .into(),
            ],
        )
        .expect("chest spawns");
    let chest_inventory = world
        .entity(chest)
        .and_then(|entity| entity.find(ComponentType::Inventory))
        .map(|component| component.handle())
        .expect("chest inventory");

    (game, player_inventory, chest_inventory)
}

#[test]
fn dropped_item_is_collected_after_pickup_delay() {
    let (mut game, player_inventory, chest_inventory) = game_with_chest();

    let dropped = game
        .world_mut()
        .drop_item(chest_inventory, "Coin")
        .expect("coin dropped");
    let chest = game.world().get::<Inventory>(chest_inventory).expect("chest inventory");
    assert!(!chest.contains("Coin"));
    assert!(chest.contains("Key"));

    // Still disabled a second later, even though the player stands on it
    game.run_for(1000);
    assert!(game.world().contains(dropped));
    let item = game
        .world()
        .get_component::<DroppedItem>(dropped)
        .expect("dropped item component");
    assert!(item.collection_hitbox().is_some());

    game.run_for(2100);
    assert!(!game.world().contains(dropped));
    let player = game.world().get::<Inventory>(player_inventory).expect("player inventory");
    assert_eq!(player.stack("Coin").map(|stack| stack.item_count), Some(12));
}

#[test]
fn dropped_item_stays_when_player_is_away() {
    let (mut game, player_inventory, chest_inventory) = game_with_chest();
    let player = player_inventory.entity;
    game.world_mut()
        .get_component_mut::<Transform>(player)
        .expect("player transform")
        .position = Vector2::new(5000.0, 5000.0);

    let dropped = game
        .world_mut()
        .drop_item(chest_inventory, "Key")
        .expect("key dropped");
    game.run_for(4000);

    assert!(game.world().contains(dropped));
    let player = game.world().get::<Inventory>(player_inventory).expect("player inventory");
    assert!(player.items().is_empty());

    assert!(game.world_mut().destroy_entity(dropped));
    assert!(game.world().pending_tasks_for(dropped).is_empty());
}

#[test]
fn dropping_a_missing_item_fails() {
    let (mut game, _, chest_inventory) = game_with_chest();
    let before = game.world().entity_count();

    assert!(game.world_mut().drop_item(chest_inventory, "Sword").is_err());
    assert_eq!(game.world().entity_count(), before);
}
