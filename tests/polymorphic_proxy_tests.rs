//! Polymorphic has-many proxy tests
//!
//! Room has many Messages; Enter, Exit and Chat are Message subtypes stored
//! in the shared `messages` collection with a `_type` discriminator.

mod common;

use common::*;

fn messages_of(room: &mut Record) -> docmap::ManyProxy<'_> {
    room.association("messages").unwrap()
}

// ============================================================================
// Schema
// ============================================================================

#[test]
fn test_type_key_on_polymorphic_base() {
    let db = TestDb::new();
    assert!(db.model("Message").key_names().contains(&TYPE_KEY));
    assert!(db.model("Chat").key_names().contains(&TYPE_KEY));
    assert!(db.model("Chat").key_names().contains(&"mood"));
    assert!(!db.model("Message").key_names().contains(&"mood"));
}

#[test]
fn test_foreign_key_declared_on_target() {
    let db = TestDb::new();
    let key = db.model("Message").def().key("room_id").cloned().unwrap();
    assert_eq!(key.key_type(), &KeyType::ObjectId);
}

#[test]
fn test_subtypes_share_collection() {
    let db = TestDb::new();
    assert_eq!(db.model("Enter").collection_name(), "messages");
    assert_eq!(db.model("Chat").collection_name(), "messages");
}

// ============================================================================
// Reading & appending
// ============================================================================

#[test]
fn test_default_reader_is_empty_without_storage() {
    let db = TestDb::new();
    let mut room = db.model("Room").new_record(Document::new());
    db.driver.reset_calls();

    let mut messages = messages_of(&mut room);
    assert!(messages.is_empty().unwrap());
    assert!(messages.to_vec().unwrap().is_empty());
    assert!(db.driver.calls().is_empty());
}

#[test]
fn test_append_like_an_array() {
    let db = TestDb::new();
    let mut room = db.model("Room").new_record(Document::new());
    let mut messages = messages_of(&mut room);
    messages.push(db.model("Enter").new_record(Document::new())).unwrap();
    messages.push(db.model("Exit").new_record(Document::new())).unwrap();
    messages
        .concat(vec![db.model("Exit").new_record(Document::new())])
        .unwrap();
    assert_eq!(messages.len().unwrap(), 3);
}

#[test]
fn test_append_stores_concrete_type() {
    let db = TestDb::new();
    let rooms = db.model("Room");
    let mut room = rooms.new_record(Document::new());
    {
        let mut messages = messages_of(&mut room);
        messages
            .push(db.model("Enter").new_record(doc! { "body" => "John entered the room" }))
            .unwrap();
        messages
            .push(db.model("Exit").new_record(doc! { "body" => "John exited the room" }))
            .unwrap();
        messages
            .concat(vec![db.model("Chat").new_record(doc! { "body" => "Holla!" })])
            .unwrap();
    }

    let mut from_db = rooms.find(room.id().unwrap()).unwrap();
    let mut messages = messages_of(&mut from_db);
    let loaded = messages.to_vec().unwrap();
    let types: Vec<&Value> = loaded.iter().map(|m| m.get(TYPE_KEY)).collect();
    assert_eq!(
        types,
        vec![&Value::from("Enter"), &Value::from("Exit"), &Value::from("Chat")]
    );
    let names: Vec<&str> = loaded.iter().map(Record::model_name).collect();
    assert_eq!(names, vec!["Enter", "Exit", "Chat"]);
}

#[test]
fn test_writes_are_eager() {
    let db = TestDb::new();
    let mut room = db.model("Room").create(Document::new()).unwrap();
    let mut messages = messages_of(&mut room);
    messages.push(db.model("Chat").new_record(Document::new())).unwrap();
    assert_eq!(db.model("Message").count(Document::new()).unwrap(), 1);
    messages.push(db.model("Chat").new_record(Document::new())).unwrap();
    assert_eq!(db.model("Message").count(Document::new()).unwrap(), 2);
}

#[test]
fn test_replace_association() {
    let db = TestDb::new();
    let rooms = db.model("Room");
    let message_model = db.model("Message");
    let mut room = rooms.create(doc! { "name" => "Lounge" }).unwrap();

    let before = message_model.count(Document::new()).unwrap();
    messages_of(&mut room)
        .replace(vec![
            db.model("Enter").new_record(doc! { "body" => "John entered room" }),
            db.model("Chat").new_record(doc! { "body" => "Heyyyoooo!" }),
            db.model("Exit").new_record(doc! { "body" => "John exited room" }),
        ])
        .unwrap();
    assert_eq!(message_model.count(Document::new()).unwrap(), before + 3);

    let mut from_db = rooms.find(room.id().unwrap()).unwrap();
    let mut messages = messages_of(&mut from_db);
    assert_eq!(messages.len().unwrap(), 3);
    let bodies: Vec<Value> = messages
        .iter()
        .unwrap()
        .map(|m| m.get("body").clone())
        .collect();
    assert_eq!(
        bodies,
        vec![
            Value::from("John entered room"),
            Value::from("Heyyyoooo!"),
            Value::from("John exited room"),
        ]
    );
}

#[test]
fn test_replace_rejects_foreign_family() {
    let db = TestDb::new();
    let mut room = db.model("Room").create(Document::new()).unwrap();
    let err = messages_of(&mut room)
        .replace(vec![db.model("User").new_record(Document::new())])
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArguments(_)));
}

#[test]
fn test_replace_with_destroyed_record_leaves_set_untouched() {
    let db = TestDb::new();
    let mut room = db.model("Room").create(Document::new()).unwrap();
    let room_id = room.id().unwrap();
    messages_of(&mut room)
        .push(db.model("Enter").new_record(doc! { "body" => "John entered room" }))
        .unwrap();

    let mut gone = db.model("Enter").create(Document::new()).unwrap();
    gone.destroy().unwrap();

    let err = messages_of(&mut room).replace(vec![gone]).unwrap_err();
    assert!(matches!(err, Error::InvalidOperation(_)));

    let stored = db
        .model("Message")
        .count(doc! { "room_id" => room_id })
        .unwrap();
    assert_eq!(stored, 1);
    let mut messages = messages_of(&mut room);
    assert_eq!(messages.len().unwrap(), 1);
    assert_eq!(messages.count(Document::new()).unwrap(), 1);
}

// ============================================================================
// build & create
// ============================================================================

mod build_and_create {
    use super::*;

    #[test]
    fn test_build_assigns_foreign_key_and_type() {
        let db = TestDb::new();
        let mut room = db.model("Room").create(Document::new()).unwrap();
        let room_id = room.id().unwrap();
        let message = messages_of(&mut room).build(doc! { "body" => "Foo!" }).unwrap();
        assert_eq!(message.get("room_id"), &Value::ObjectId(room_id));
        assert_eq!(message.get(TYPE_KEY), &Value::from("Message"));
        assert_eq!(message.get("body"), &Value::from("Foo!"));
        assert!(message.is_new());
    }

    #[test]
    fn test_create_assigns_foreign_key_and_type() {
        let db = TestDb::new();
        let mut room = db.model("Room").create(Document::new()).unwrap();
        let room_id = room.id().unwrap();
        let message = messages_of(&mut room).create(Document::new()).unwrap();
        assert_eq!(message.get("room_id"), &Value::ObjectId(room_id));
        assert_eq!(message.get(TYPE_KEY), &Value::from("Message"));
    }

    #[test]
    fn test_create_saves_record() {
        let db = TestDb::new();
        let message_model = db.model("Message");
        let mut room = db.model("Room").create(Document::new()).unwrap();
        let before = message_model.count(Document::new()).unwrap();
        let message = messages_of(&mut room)
            .create(doc! { "body" => "Foo!" })
            .unwrap();
        assert!(message.is_persisted());
        assert_eq!(message.get("body"), &Value::from("Foo!"));
        assert_eq!(message_model.count(Document::new()).unwrap(), before + 1);
    }
}

// ============================================================================
// count
// ============================================================================

mod count {
    use super::*;

    #[test]
    fn test_scoped_to_association() {
        let db = TestDb::new();
        let rooms = db.model("Room");
        let mut room = rooms.create(Document::new()).unwrap();
        for _ in 0..3 {
            messages_of(&mut room).create(Document::new()).unwrap();
        }
        let mut other_room = rooms.create(Document::new()).unwrap();
        for _ in 0..2 {
            messages_of(&mut other_room).create(Document::new()).unwrap();
        }

        assert_eq!(messages_of(&mut room).count(Document::new()).unwrap(), 3);
        assert_eq!(messages_of(&mut other_room).count(Document::new()).unwrap(), 2);
    }

    #[test]
    fn test_with_conditions() {
        let db = TestDb::new();
        let mut room = db.model("Room").create(Document::new()).unwrap();
        let mut messages = messages_of(&mut room);
        messages.create(doc! { "body" => "Foo" }).unwrap();
        messages.create(doc! { "body" => "Other 1" }).unwrap();
        messages.create(doc! { "body" => "Other 2" }).unwrap();
        assert_eq!(messages.count(doc! { "body" => "Foo" }).unwrap(), 1);
    }
}

// ============================================================================
// Finding scoped to association
// ============================================================================

mod scoped_finders {
    use super::*;

    struct Fixture {
        db: TestDb,
        lounge: Record,
        hall: Record,
        lm1: Record,
        lm2: Record,
        hm1: Record,
        hm2: Record,
        hm3: Record,
    }

    fn fixture() -> Fixture {
        let db = TestDb::new();
        let rooms = db.model("Room");
        let messages = db.model("Message");

        let mut lounge = rooms.create(doc! { "name" => "Lounge" }).unwrap();
        let lm1 = messages.create(doc! { "body" => "Loungin!" }).unwrap();
        let lm2 = messages.create(doc! { "body" => "I love loungin!" }).unwrap();
        messages_of(&mut lounge)
            .replace(vec![lm1.clone(), lm2.clone()])
            .unwrap();
        lounge.save().unwrap();

        let mut hall = rooms.create(doc! { "name" => "Hall" }).unwrap();
        let hm1 = messages.create(doc! { "body" => "Do not fall in the hall" }).unwrap();
        let hm2 = messages.create(doc! { "body" => "Hall the king!" }).unwrap();
        let hm3 = messages.create(doc! { "body" => "Loungin!" }).unwrap();
        messages_of(&mut hall)
            .replace(vec![hm1.clone(), hm2.clone(), hm3.clone()])
            .unwrap();
        hall.save().unwrap();

        Fixture {
            db,
            lounge,
            hall,
            lm1,
            lm2,
            hm1,
            hm2,
            hm3,
        }
    }

    #[test]
    fn test_all() {
        let mut f = fixture();
        let messages = messages_of(&mut f.lounge);
        let found = messages
            .find_with(Selector::All, FindOptions::new())
            .unwrap()
            .into_records();
        assert_eq!(found, vec![f.lm1.clone(), f.lm2.clone()]);
        assert_eq!(messages.all(FindOptions::new()).unwrap(), vec![f.lm1, f.lm2]);
    }

    #[test]
    fn test_all_with_conditions() {
        let mut f = fixture();
        let messages = messages_of(&mut f.lounge);
        assert_eq!(
            messages
                .all(FindOptions::new().conditions(doc! { "body" => "Loungin!" }))
                .unwrap(),
            vec![f.lm1.clone()]
        );
        assert_eq!(
            messages
                .find_with(
                    Selector::All,
                    FindOptions::new().conditions(doc! { ":body" => "Loungin!" })
                )
                .unwrap()
                .into_records(),
            vec![f.lm1]
        );
    }

    #[test]
    fn test_all_with_natural_order() {
        let mut f = fixture();
        let messages = messages_of(&mut f.lounge);
        assert_eq!(
            messages.all(FindOptions::new().order("$natural desc")).unwrap(),
            vec![f.lm2, f.lm1]
        );
    }

    #[test]
    fn test_first() {
        let mut f = fixture();
        let messages = messages_of(&mut f.lounge);
        assert_eq!(messages.first(FindOptions::new()).unwrap(), Some(f.lm1.clone()));
        assert_eq!(
            messages
                .find_with(Selector::First, FindOptions::new())
                .unwrap()
                .into_record(),
            Some(f.lm1)
        );
        assert_eq!(
            messages
                .first(FindOptions::new().conditions(doc! { "body" => "I love loungin!" }))
                .unwrap(),
            Some(f.lm2)
        );
    }

    #[test]
    fn test_last() {
        let mut f = fixture();
        let messages = messages_of(&mut f.lounge);
        assert_eq!(messages.last(FindOptions::new()).unwrap(), Some(f.lm2.clone()));
        assert_eq!(
            messages
                .find_with(Selector::Last, FindOptions::new())
                .unwrap()
                .into_record(),
            Some(f.lm2)
        );
        assert_eq!(
            messages
                .last(FindOptions::new().conditions(doc! { "body" => "Loungin!" }))
                .unwrap(),
            Some(f.lm1)
        );
    }

    #[test]
    fn test_find_one_id() {
        let mut f = fixture();
        let hm2_id = f.hm2.id().unwrap();
        let messages = messages_of(&mut f.lounge);
        assert_eq!(messages.find(f.lm2.id().unwrap()).unwrap(), f.lm2);
        assert!(messages.find(hm2_id).unwrap_err().is_document_not_found());
    }

    #[test]
    fn test_find_many_ids() {
        let mut f = fixture();
        let hm2_id = f.hm2.id().unwrap();
        let messages = messages_of(&mut f.lounge);
        let ids = vec![f.lm1.id().unwrap(), f.lm2.id().unwrap()];
        assert_eq!(
            messages.find_many(ids.clone()).unwrap(),
            vec![f.lm1.clone(), f.lm2.clone()]
        );

        let mut with_foreign = ids;
        with_foreign.push(hm2_id);
        assert!(messages
            .find_many(with_foreign)
            .unwrap_err()
            .is_document_not_found());
    }

    #[test]
    fn test_paginate() {
        let mut f = fixture();
        let messages = messages_of(&mut f.hall);
        let page = messages
            .paginate(PaginateOptions::new().per_page(2).page(1).order("$natural asc"))
            .unwrap();
        assert_eq!(page.total_pages(), 2);
        assert_eq!(page.total_entries(), 3);
        assert_eq!(page.items(), &[f.hm1.clone(), f.hm2.clone()][..]);

        let page = messages
            .paginate(PaginateOptions::new().per_page(2).page(2).order("$natural asc"))
            .unwrap();
        assert_eq!(page.items(), &[f.hm3.clone()][..]);
    }

    #[test]
    fn test_loaded_list_matches_finders() {
        let mut f = fixture();
        let expected = vec![f.hm1.clone(), f.hm2.clone(), f.hm3.clone()];
        let mut messages = messages_of(&mut f.hall);
        assert_eq!(messages.to_vec().unwrap(), expected);
        assert_eq!(messages.get(1).unwrap(), Some(&expected[1]));
    }

    #[test]
    fn test_replace_detaches_previous_members() {
        let mut f = fixture();
        let kept = f.hm1.clone();
        messages_of(&mut f.hall).replace(vec![kept.clone()]).unwrap();

        let messages = messages_of(&mut f.hall);
        assert_eq!(messages.count(Document::new()).unwrap(), 1);
        assert_eq!(messages.all(FindOptions::new()).unwrap(), vec![kept]);

        let detached = f.db.model("Message").find(f.hm3.id().unwrap()).unwrap();
        assert!(detached.get("room_id").is_null());
    }
}

// ============================================================================
// Subtype queries & hydration
// ============================================================================

mod hydration {
    use super::*;

    #[test]
    fn test_subtype_model_sees_only_its_type() {
        let db = TestDb::new();
        db.model("Enter").create(Document::new()).unwrap();
        db.model("Chat").create(Document::new()).unwrap();
        db.model("Chat").create(Document::new()).unwrap();

        assert_eq!(db.model("Message").count(Document::new()).unwrap(), 3);
        assert_eq!(db.model("Chat").count(Document::new()).unwrap(), 2);
        assert_eq!(db.model("Enter").all(FindOptions::new()).unwrap().len(), 1);
        assert!(db.model("Exit").first(FindOptions::new()).unwrap().is_none());
    }

    #[test]
    fn test_root_query_hydrates_subtypes() {
        let db = TestDb::new();
        let chat = db
            .model("Chat")
            .create(doc! { "body" => "hi", "mood" => "cheerful" })
            .unwrap();
        let loaded = db.model("Message").find(chat.id().unwrap()).unwrap();
        assert_eq!(loaded.model_name(), "Chat");
        assert_eq!(loaded.get("mood"), &Value::from("cheerful"));
    }

    #[test]
    fn test_subtype_find_of_other_type_is_not_found() {
        let db = TestDb::new();
        let enter = db.model("Enter").create(Document::new()).unwrap();
        let err = db.model("Exit").find(enter.id().unwrap()).unwrap_err();
        assert!(err.is_document_not_found());
    }

    #[test]
    fn test_unknown_discriminator_falls_back_to_root() {
        let db = TestDb::new();
        db.driver
            .insert("messages", doc! { "_type" => "Shout", "body" => "HEY" })
            .unwrap();
        let loaded = db.model("Message").first(FindOptions::new()).unwrap().unwrap();
        assert_eq!(loaded.model_name(), "Message");
        assert_eq!(loaded.get(TYPE_KEY), &Value::from("Shout"));
    }
}
