mod common;

use scumm_rs::resource::descriptor::{AudioDriver, GameDescriptor, GameId};
use scumm_rs::resource::index::ResourceIndex;
use scumm_rs::resource::locator::{ResourceClass, ResourceLocator};
use scumm_rs::resource::resource_manager::{
    ResourceManager, ResourceManagerConfig, ResourceManagerError,
};
use scumm_rs::resource::storage::MemoryStorage;
use scumm_rs::Generation;

use common::{ABSENT_SCRIPT, BROKEN_SCRIPT, ROOM_TWO_SCRIPT, SCRIPT_SIZE};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn manager(min: usize, max: usize) -> Result<ResourceManager<MemoryStorage>, ResourceManagerError> {
    let config = ResourceManagerConfig::for_generation(Generation::V5).with_thresholds(min, max);
    ResourceManager::with_config(common::storage(), common::descriptor(), config)
}

#[test]
fn test_resources_resolve_through_the_room_offset_table() -> TestResult {
    let mut manager = manager(400_000, 550_000)?;

    let room = manager.room(1)?.ok_or("room 1")?;
    assert_eq!(room.header.width, 320);
    assert_eq!(room.exit_script.data, vec![1, 2, 3, 4]);
    let room = manager.room(2)?.ok_or("room 2")?;
    assert_eq!(room.header.width, 640);

    assert_eq!(manager.script(3)?, Some(&[3u8; SCRIPT_SIZE][..]));
    assert_eq!(manager.script(ROOM_TWO_SCRIPT)?, Some(&[7u8; SCRIPT_SIZE][..]));
    assert_eq!(manager.costume(1)?.map(<[u8]>::len), Some(50));
    assert_eq!(manager.charset(1)?, Some(&[0xC5u8; 12][..]));
    assert_eq!(manager.limits().variables, 800);
    Ok(())
}

#[test]
fn test_sound_follows_the_requested_driver() -> TestResult {
    let mut manager = manager(400_000, 550_000)?;
    assert_eq!(manager.default_sound(1)?, Some(&[0xADu8; 20][..]));
    assert_eq!(manager.sound(AudioDriver::PcSpeaker, 1)?, Some(&[0x5Bu8; 10][..]));
    assert_eq!(manager.allocated_bytes(), 10);
    assert_eq!(manager.sound(AudioDriver::AdLib, 1)?, Some(&[0xADu8; 20][..]));
    assert_eq!(manager.allocated_bytes(), 20);
    Ok(())
}

#[test]
fn test_absent_resources_open_no_file() -> TestResult {
    let storage = MemoryStorage::new();
    let descriptor = common::descriptor();
    let mut index = ResourceIndex::new(Generation::V5);
    index.scripts = vec![
        ResourceLocator::ABSENT,
        ResourceLocator::new(0, 0x40),
        ResourceLocator::new(3, 0xFFFF_FFFF),
    ];
    let config = ResourceManagerConfig::for_generation(Generation::V5);
    let mut manager = ResourceManager::from_index(storage, descriptor, index, config)?;

    for id in 0..4 {
        assert_eq!(manager.script(id)?, None);
    }
    assert_eq!(manager.room(0)?.map(|room| room.size), None);
    assert_eq!(manager.costume(5)?, None);
    assert_eq!(manager.storage().reads(), 0);
    Ok(())
}

#[test]
fn test_absent_script_in_a_real_index() -> TestResult {
    let mut manager = manager(400_000, 550_000)?;
    assert_eq!(manager.script(ABSENT_SCRIPT)?, None);
    assert_eq!(manager.script(0)?, None);
    assert_eq!(manager.storage().reads(), 1);
    Ok(())
}

#[test]
fn test_unreadable_script_is_treated_as_absent() -> TestResult {
    let mut manager = manager(400_000, 550_000)?;
    assert_eq!(manager.script(BROKEN_SCRIPT)?, None);
    assert!(!manager.is_resident(ResourceClass::Script, BROKEN_SCRIPT));
    assert!(manager.costume(1)?.is_some());
    Ok(())
}

#[test]
fn test_unreadable_script_is_decoded_once() -> TestResult {
    let mut config = ResourceManagerConfig::for_generation(Generation::V5);
    config.cache_containers = false;
    let mut manager = ResourceManager::with_config(common::storage(), common::descriptor(), config)?;

    assert_eq!(manager.script(BROKEN_SCRIPT)?, None);
    assert!(manager.is_unreadable(ResourceClass::Script, BROKEN_SCRIPT));
    // the index and one container read
    assert_eq!(manager.storage().reads(), 2);

    assert_eq!(manager.script(BROKEN_SCRIPT)?, None);
    manager.load_script(BROKEN_SCRIPT)?;
    assert_eq!(manager.storage().reads(), 2);

    assert!(manager.script(1)?.is_some());
    assert_eq!(manager.storage().reads(), 3);
    Ok(())
}

#[test]
fn test_costume_decode_failures_propagate() -> TestResult {
    let mut index = ResourceIndex::load(&common::storage(), &common::descriptor())?;
    // point costume 1 at a script chunk
    index.costumes[1] = index.scripts[1];
    let config = ResourceManagerConfig::for_generation(Generation::V5);
    let mut manager =
        ResourceManager::from_index(common::storage(), common::descriptor(), index, config)?;
    match manager.costume(1) {
        Err(ResourceManagerError::DecodeError { class, id, .. }) => {
            assert_eq!((class, id), (ResourceClass::Costume, 1));
        }
        other => panic!("unexpected result {:?}", other.map(|data| data.map(<[u8]>::len))),
    }
    Ok(())
}

#[test]
fn test_missing_container_is_a_storage_error() -> TestResult {
    let (index, _) = common::container();
    let storage = MemoryStorage::new().with_file("monkey.000", index);
    let mut manager = ResourceManager::new(storage, common::descriptor())?;
    assert!(matches!(
        manager.script(1),
        Err(ResourceManagerError::StorageError(_))
    ));
    Ok(())
}

#[test]
fn test_eviction_picks_the_lowest_aged_counter() -> TestResult {
    let mut manager = manager(250, 350)?;
    for id in 1..=3 {
        manager.load_script(id)?;
    }
    assert_eq!(manager.allocated_bytes(), 300);
    assert_eq!(manager.script_counter(1), Some(3));
    assert_eq!(manager.script_counter(2), Some(2));
    assert_eq!(manager.script_counter(3), Some(1));

    manager.load_script(4)?;
    let report = manager.last_expire().ok_or("no sweep recorded")?;
    assert_eq!(
        report.evicted,
        vec![(ResourceClass::Script, 2), (ResourceClass::Script, 1)]
    );
    assert_eq!(report.freed_bytes, 200);
    assert!(!report.exhausted);
    assert_eq!(manager.allocated_bytes(), 200);
    assert!(manager.is_resident(ResourceClass::Script, 3));
    assert!(manager.is_resident(ResourceClass::Script, 4));
    Ok(())
}

#[test]
fn test_resident_total_stays_within_budget() -> TestResult {
    let max = 350;
    let mut manager = manager(250, max)?;
    for round in 0..4 {
        for id in [1, 2, 3, 4, 5, ROOM_TWO_SCRIPT] {
            manager.load_script(id)?;
            let exhausted = manager.last_expire().map_or(false, |report| report.exhausted);
            assert!(
                manager.allocated_bytes() <= max || exhausted,
                "round {} script {}: {} bytes resident",
                round,
                id,
                manager.allocated_bytes()
            );
        }
    }
    Ok(())
}

#[test]
fn test_locked_scripts_survive_pressure() -> TestResult {
    let mut manager = manager(150, 250)?;
    manager.load_script(1)?;
    manager.lock_script(1);
    for id in 2..=5 {
        manager.load_script(id)?;
        assert!(manager.is_resident(ResourceClass::Script, 1));
    }
    assert!(manager.is_locked(ResourceClass::Script, 1));

    manager.unlock_script(1);
    manager.load_script(ROOM_TWO_SCRIPT)?;
    assert!(!manager.is_resident(ResourceClass::Script, 1));
    Ok(())
}

#[test]
fn test_entries_in_use_are_not_evicted() -> TestResult {
    let mut manager = manager(150, 250)?.with_usage(|class: ResourceClass, id: u16| {
        class == ResourceClass::Script && id == 2
    });
    for id in 1..=5 {
        manager.load_script(id)?;
    }
    assert!(manager.is_resident(ResourceClass::Script, 2));
    assert!(!manager.is_resident(ResourceClass::Script, 1));
    Ok(())
}

#[test]
fn test_nothing_evictable_is_reported() -> TestResult {
    let mut manager = manager(50, 150)?;
    manager.load_script(1)?;
    manager.lock_script(1);
    manager.load_script(2)?;
    let report = manager.last_expire().ok_or("no sweep recorded")?;
    assert!(report.exhausted);
    assert!(report.evicted.is_empty());
    assert_eq!(manager.allocated_bytes(), 200);
    Ok(())
}

#[test]
fn test_counters_age_and_saturate() -> TestResult {
    let mut manager = manager(400_000, 550_000)?;
    manager.load_script(1)?;
    assert_eq!(manager.script_counter(1), Some(1));
    for n in 1..=5u8 {
        manager.expire(0);
        assert_eq!(manager.script_counter(1), Some(1 + n));
    }

    assert!(manager.set_script_counter(1, 126));
    manager.expire(0);
    manager.expire(0);
    assert_eq!(manager.script_counter(1), Some(127));

    assert!(manager.set_script_counter(1, 0));
    manager.expire(0);
    assert_eq!(manager.script_counter(1), Some(0));

    assert!(!manager.set_script_counter(2, 5));
    assert_eq!(manager.script_counter(2), None);
    Ok(())
}

#[test]
fn test_invalid_thresholds_are_rejected() {
    let config = ResourceManagerConfig::for_generation(Generation::V5).with_thresholds(500, 400);
    let result = ResourceManager::with_config(common::storage(), common::descriptor(), config);
    assert!(matches!(
        result.map(|_| ()),
        Err(ResourceManagerError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_positional_rooms_live_in_their_own_files() -> TestResult {
    let mut room = vec![0u8; 28];
    room[0..2].copy_from_slice(&28u16.to_le_bytes());
    room[4] = 40;
    room[5] = 16;
    let lfl: Vec<u8> = room.iter().map(|b| b ^ 0xFF).collect();

    let mut index = ResourceIndex::new(Generation::V2);
    index.rooms = vec![ResourceLocator::ABSENT, ResourceLocator::ABSENT, ResourceLocator::new(1, 0)];
    let storage = MemoryStorage::new().with_file("02.LFL", lfl);
    let descriptor = GameDescriptor::new(GameId::Zak, "zak", Generation::V2);
    let config = ResourceManagerConfig::for_generation(Generation::V2);
    let mut manager = ResourceManager::from_index(storage, descriptor, index, config)?;

    let room = manager.room(2)?.ok_or("room 2")?;
    assert_eq!((room.header.width, room.header.height), (320, 128));
    assert_eq!(room.size, 28);
    assert_eq!(manager.charset(0)?, None);
    Ok(())
}

#[test]
fn test_small_bundle_resolves_through_its_offset_table() -> TestResult {
    let (descriptor, storage) = common::small_bundle();
    let mut manager = ResourceManager::new(storage, descriptor)?;

    let room = manager.room(1)?.ok_or("room 1")?;
    assert_eq!((room.header.width, room.header.height), (320, 144));
    assert_eq!(room.exit_script.data, vec![1, 2]);
    assert_eq!(room.entry_script.data, vec![3]);
    assert_eq!(manager.script(1)?, Some(&[9u8; SCRIPT_SIZE][..]));
    // index and disk
    assert_eq!(manager.storage().reads(), 2);
    Ok(())
}

#[test]
fn test_charset_files_of_generations_three_and_four() -> TestResult {
    let v3_charset: Vec<u8> = [4, 0, 0xC1, 0xC2, 0xC3, 0xC4].iter().map(|b| b ^ 0xFF).collect();
    let storage = MemoryStorage::new().with_file("98.LFL", v3_charset);
    let descriptor = GameDescriptor::new(GameId::Indy3, "indy3", Generation::V3);
    let config = ResourceManagerConfig::for_generation(Generation::V3);
    let mut manager =
        ResourceManager::from_index(storage, descriptor, ResourceIndex::new(Generation::V3), config)?;
    assert_eq!(manager.charset(1)?, Some(&[0xC1u8, 0xC2, 0xC3, 0xC4][..]));
    assert_eq!(manager.charset(2)?, None);

    let storage = MemoryStorage::new().with_file("901.LFL", vec![3, 0, 0, 0, 0xD1, 0xD2, 0xD3]);
    let descriptor = GameDescriptor::new(GameId::Loom, "loom", Generation::V4);
    let config = ResourceManagerConfig::for_generation(Generation::V4);
    let mut manager =
        ResourceManager::from_index(storage, descriptor, ResourceIndex::new(Generation::V4), config)?;
    assert_eq!(manager.charset(1)?, Some(&[0xD1u8, 0xD2, 0xD3][..]));
    assert!(manager.is_resident(ResourceClass::Charset, 1));
    assert_eq!(manager.allocated_bytes(), 0);
    Ok(())
}

