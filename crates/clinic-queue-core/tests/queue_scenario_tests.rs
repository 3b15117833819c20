//! End-to-end queue scenarios through the service facade.

use clinic_queue_core::{CallStatus, PatientId, QueueError, QueueService, Room};

fn slot_for(service: &QueueService, room: Room) -> Option<(String, i64)> {
    let index = Room::DISPLAY_ORDER
        .iter()
        .position(|r| *r == room)
        .unwrap();
    service.current_announcements().unwrap()[index]
        .as_ref()
        .map(|a| (a.name.clone(), a.token))
}

#[test]
fn test_alice_full_cycle() {
    let service = QueueService::open_in_memory().unwrap();

    let alice = service.register("Alice", "2").unwrap();
    assert_eq!(alice.status, CallStatus::Waiting);
    assert_eq!(alice.called_seq, 0);
    assert_eq!(slot_for(&service, Room::Room2), None);

    let called = service.call(alice.id).unwrap();
    assert_eq!(called.status, CallStatus::Called);
    assert_eq!(called.called_seq, 1);
    assert_eq!(slot_for(&service, Room::Room2), Some(("Alice".into(), 1)));

    let recalled = service.recall(alice.id).unwrap();
    assert_eq!(recalled.status, CallStatus::Called);
    assert_eq!(recalled.called_seq, 2);
    assert_eq!(slot_for(&service, Room::Room2), Some(("Alice".into(), 2)));

    let done = service.complete(alice.id).unwrap();
    assert_eq!(done.status, CallStatus::Done);
    assert_eq!(done.called_seq, 2);
    assert_eq!(slot_for(&service, Room::Room2), None);

    // Record survives completion
    assert_eq!(service.get(alice.id).unwrap().called_seq, 2);
}

#[test]
fn test_calling_again_bumps_token_only() {
    let service = QueueService::open_in_memory().unwrap();
    let bob = service.register("Bob", "Xray").unwrap();

    service.call(bob.id).unwrap();
    let again = service.call(bob.id).unwrap();

    assert_eq!(again.status, CallStatus::Called);
    assert_eq!(again.called_seq, 2);
}

#[test]
fn test_done_patient_can_be_called_back() {
    let service = QueueService::open_in_memory().unwrap();
    let cara = service.register("Cara", "ECG").unwrap();

    service.call(cara.id).unwrap();
    service.complete(cara.id).unwrap();
    let back = service.call(cara.id).unwrap();

    assert_eq!(back.status, CallStatus::Called);
    assert_eq!(back.called_seq, 2);
    assert_eq!(slot_for(&service, Room::Ecg), Some(("Cara".into(), 2)));
}

#[test]
fn test_latest_call_takes_the_room() {
    let service = QueueService::open_in_memory().unwrap();
    let a = service.register("Ana", "1").unwrap();
    let b = service.register("Ben", "1").unwrap();

    service.call(a.id).unwrap();
    service.call(a.id).unwrap();
    service.call(b.id).unwrap();
    // Ana has the higher token, so she stays on screen
    assert_eq!(slot_for(&service, Room::Room1), Some(("Ana".into(), 2)));

    service.recall(b.id).unwrap();
    // Tokens tie at 2; the newer registration wins
    assert_eq!(slot_for(&service, Room::Room1), Some(("Ben".into(), 2)));

    service.complete(b.id).unwrap();
    assert_eq!(slot_for(&service, Room::Room1), Some(("Ana".into(), 2)));
}

#[test]
fn test_rooms_are_independent() {
    let service = QueueService::open_in_memory().unwrap();
    let a = service.register("Ana", "3").unwrap();
    let b = service.register("Ben", "Extraction").unwrap();
    service.call(a.id).unwrap();
    service.call(b.id).unwrap();

    let slots = service.current_announcements().unwrap();
    let occupied: Vec<_> = slots
        .iter()
        .enumerate()
        .filter_map(|(i, slot)| slot.as_ref().map(|a| (i, a.room)))
        .collect();
    assert_eq!(occupied, vec![(2, Room::Room3), (5, Room::Extraction)]);
}

#[test]
fn test_remove() {
    let service = QueueService::open_in_memory().unwrap();
    let dan = service.register("Dan", "4").unwrap();
    service.call(dan.id).unwrap();

    assert!(matches!(
        service.remove(PatientId(dan.id.0 + 100)),
        Err(QueueError::NotFound(_))
    ));

    service.remove(dan.id).unwrap();
    assert!(matches!(service.get(dan.id), Err(QueueError::NotFound(_))));
    assert_eq!(slot_for(&service, Room::Room4), None);
    assert!(matches!(service.remove(dan.id), Err(QueueError::NotFound(_))));
}

#[test]
fn test_admin_list_newest_first() {
    let service = QueueService::open_in_memory().unwrap();
    let names = ["Ana", "Ben", "Cid"];
    for name in names {
        service.register(name, "5").unwrap();
    }

    let listed: Vec<_> = service
        .list_for_admin()
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(listed, vec!["Cid", "Ben", "Ana"]);
}

#[test]
fn test_names_are_trimmed() {
    let service = QueueService::open_in_memory().unwrap();
    let p = service.register("  Eve \n", "1").unwrap();
    assert_eq!(p.name, "Eve");
    assert_eq!(service.get(p.id).unwrap().name, "Eve");
}
