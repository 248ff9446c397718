use userstore_core::{Query, Repository, Store, User, UserField, UserId, UserType, UserTypeField};

fn seeded_store() -> (Store, i64) {
    let mut store = Store::open_in_memory().unwrap();
    let mut user_type = UserType::new("admin", "Administrators");
    let mut uow = store.unit_of_work();
    uow.user_types().add_or_update(&mut user_type).unwrap();
    uow.commit().unwrap();
    let type_id = user_type.id().unwrap();
    (store, type_id)
}

fn test_user(user_type: i64, username: &str) -> User {
    User::new(
        user_type,
        format!("{username} Name"),
        username,
        format!("{}@example.com", username.to_lowercase()),
    )
}

fn persist(store: &mut Store, user: &mut User) -> UserId {
    let mut uow = store.unit_of_work();
    uow.users().add_or_update(user).unwrap();
    uow.commit().unwrap();
    user.id().unwrap()
}

fn load(store: &mut Store, id: UserId) -> User {
    store.unit_of_work().users().get(id).unwrap().unwrap()
}

fn section_rows(store: &Store, id: UserId) -> i64 {
    store
        .connection()
        .query_row(
            "SELECT COUNT(*) FROM user_sections WHERE user_id = ?1;",
            [id],
            |row| row.get(0),
        )
        .unwrap()
}

#[test]
fn user_with_sections_round_trips() {
    let (mut store, type_id) = seeded_store();
    let mut user = test_user(type_id, "TestUser1");
    user.add_allowed_section("content");
    user.add_allowed_section("media");
    assert!(!user.has_identity());

    let id = persist(&mut store, &mut user);

    let loaded = load(&mut store, id);
    assert_eq!(loaded, user);
    assert_eq!(loaded.username, "TestUser1");
    assert_eq!(
        loaded.allowed_sections().collect::<Vec<_>>(),
        vec!["content", "media"]
    );
    assert_eq!(section_rows(&store, id), 2);
}

#[test]
fn committed_entity_gets_identity_and_is_clean() {
    let (mut store, type_id) = seeded_store();
    let mut user = test_user(type_id, "fresh");
    assert!(user.is_dirty());

    let id = persist(&mut store, &mut user);

    assert!(id > 0);
    assert!(user.has_identity());
    assert!(!user.is_dirty());
}

#[test]
fn freshly_loaded_user_is_not_dirty_until_mutated() {
    let (mut store, type_id) = seeded_store();
    let mut user = test_user(type_id, "reader");
    user.add_allowed_section("settings");
    let id = persist(&mut store, &mut user);

    let mut loaded = load(&mut store, id);
    assert!(!loaded.is_dirty());

    loaded.name = "Renamed".to_string();
    assert!(loaded.is_dirty());
    assert_eq!(loaded.changed_fields(), vec![UserField::Name]);

    loaded.name = user.name.clone();
    assert!(!loaded.is_dirty());
}

#[test]
fn redundant_section_edits_collapse_to_net_membership() {
    let (mut store, type_id) = seeded_store();
    let mut user = test_user(type_id, "TestUser1");
    user.add_allowed_section("content");
    user.add_allowed_section("media");
    let id = persist(&mut store, &mut user);

    let mut loaded = load(&mut store, id);
    loaded.remove_allowed_section("content");
    loaded.remove_allowed_section("content");
    loaded.add_allowed_section("content");
    loaded.remove_allowed_section("content");

    let mut uow = store.unit_of_work();
    uow.users().add_or_update(&mut loaded).unwrap();
    let summary = uow.commit().unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.members_deleted, 1);
    assert_eq!(summary.members_inserted, 0);

    let reloaded = load(&mut store, id);
    assert_eq!(reloaded.allowed_sections().collect::<Vec<_>>(), vec!["media"]);
    assert_eq!(section_rows(&store, id), 1);
}

#[test]
fn net_zero_section_edits_stage_nothing() {
    let (mut store, type_id) = seeded_store();
    let mut user = test_user(type_id, "steady");
    user.add_allowed_section("media");
    let id = persist(&mut store, &mut user);

    let mut loaded = load(&mut store, id);
    loaded.add_allowed_section("translation");
    loaded.remove_allowed_section("translation");
    loaded.add_allowed_section("media");
    assert!(!loaded.is_dirty());

    let mut uow = store.unit_of_work();
    uow.users().add_or_update(&mut loaded).unwrap();
    assert_eq!(uow.staged_count(), 0);
    assert_eq!(uow.commit().unwrap().entities(), 0);
}

#[test]
fn section_grants_and_revokes_apply_as_diff() {
    let (mut store, type_id) = seeded_store();
    let mut user = test_user(type_id, "grantee");
    user.add_allowed_section("content");
    user.add_allowed_section("media");
    let id = persist(&mut store, &mut user);

    user.remove_allowed_section("media");
    user.add_allowed_section(" settings ");
    user.add_allowed_section("users");

    let mut uow = store.unit_of_work();
    uow.users().add_or_update(&mut user).unwrap();
    let summary = uow.commit().unwrap();
    assert_eq!(summary.members_deleted, 1);
    assert_eq!(summary.members_inserted, 2);
    assert!(!user.is_dirty());

    let reloaded = load(&mut store, id);
    assert_eq!(
        reloaded.allowed_sections().collect::<Vec<_>>(),
        vec!["content", "settings", "users"]
    );
}

#[test]
fn updating_every_scalar_round_trips() {
    let (mut store, type_id) = seeded_store();
    let mut other_type = UserType::new("writer", "Writers");
    {
        let mut uow = store.unit_of_work();
        uow.user_types().add_or_update(&mut other_type).unwrap();
        uow.commit().unwrap();
    }
    let mut user = test_user(type_id, "before");
    let id = persist(&mut store, &mut user);

    let mut loaded = load(&mut store, id);
    loaded.name = "After Name".to_string();
    loaded.username = "after".to_string();
    loaded.email = "after@example.org".to_string();
    loaded.password = "hashed-secret".to_string();
    loaded.language = "da".to_string();
    loaded.permissions = "ABC".to_string();
    loaded.is_approved = false;
    loaded.no_console = true;
    loaded.default_to_live_editing = true;
    loaded.start_content_id = 1047;
    loaded.start_media_id = 1051;
    loaded.user_type = other_type.id().unwrap();
    assert_eq!(loaded.changed_fields().len(), UserField::ALL.len());

    let mut uow = store.unit_of_work();
    uow.users().add_or_update(&mut loaded).unwrap();
    uow.commit().unwrap();

    let reloaded = load(&mut store, id);
    assert_eq!(reloaded, loaded);
    assert!(!reloaded.is_approved);
    assert!(reloaded.no_console);
    assert_eq!(reloaded.start_media_id, 1051);
}

#[test]
fn clean_persisted_user_is_skipped() {
    let (mut store, type_id) = seeded_store();
    let mut user = test_user(type_id, "idle");
    persist(&mut store, &mut user);

    let mut uow = store.unit_of_work();
    uow.users().add_or_update(&mut user).unwrap();
    assert_eq!(uow.staged_count(), 0);
}

#[test]
fn deleted_user_is_gone_with_its_sections() {
    let (mut store, type_id) = seeded_store();
    let mut user = test_user(type_id, "doomed");
    user.add_allowed_section("content");
    user.add_allowed_section("media");
    let id = persist(&mut store, &mut user);

    let mut uow = store.unit_of_work();
    uow.users().delete(&mut user).unwrap();
    let summary = uow.commit().unwrap();
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.members_deleted, 2);

    assert!(store.unit_of_work().users().get(id).unwrap().is_none());
    assert!(!store.unit_of_work().users().exists(id).unwrap());
    assert_eq!(section_rows(&store, id), 0);
    assert_eq!(user.id(), Some(id));
}

#[test]
fn get_of_absent_id_is_none() {
    let (mut store, _) = seeded_store();
    assert!(store.unit_of_work().users().get(9_999).unwrap().is_none());
}

#[test]
fn get_all_returns_existing_subset_of_requested_ids() {
    let (mut store, type_id) = seeded_store();
    let mut first = test_user(type_id, "first");
    let mut second = test_user(type_id, "second");
    let mut third = test_user(type_id, "third");
    {
        let mut uow = store.unit_of_work();
        let mut users = uow.users();
        users.add_or_update(&mut first).unwrap();
        users.add_or_update(&mut second).unwrap();
        users.add_or_update(&mut third).unwrap();
        assert_eq!(uow.staged_count(), 3);
        let summary = uow.commit().unwrap();
        assert_eq!(summary.inserted, 3);
    }
    let (first_id, third_id) = (first.id().unwrap(), third.id().unwrap());

    let found = store
        .unit_of_work()
        .users()
        .get_all(&[first_id, third_id, 9_999])
        .unwrap();
    let ids = found.iter().filter_map(User::id).collect::<Vec<_>>();
    assert_eq!(ids, vec![first_id, third_id]);
}

#[test]
fn get_all_without_ids_returns_every_user() {
    let (mut store, type_id) = seeded_store();
    let mut users = vec![
        test_user(type_id, "TestUser1"),
        test_user(type_id, "TestUser2"),
        test_user(type_id, "TestUser3"),
    ];
    {
        let mut uow = store.unit_of_work();
        for user in users.iter_mut() {
            uow.users().add_or_update(user).unwrap();
        }
        uow.commit().unwrap();
    }

    let all = store.unit_of_work().users().get_all(&[]).unwrap();
    assert!(all.len() >= 3);
    for user in &users {
        assert!(all.iter().any(|loaded| loaded.id() == user.id()));
    }
}

#[test]
fn exists_reports_presence() {
    let (mut store, type_id) = seeded_store();
    let mut user = test_user(type_id, "present");
    let id = persist(&mut store, &mut user);

    let mut uow = store.unit_of_work();
    let users = uow.users();
    assert!(users.exists(id).unwrap());
    assert!(!users.exists(id + 100).unwrap());
}

#[test]
fn count_matches_query_results_for_or_and_predicates() {
    let (mut store, type_id) = seeded_store();
    let mut first = test_user(type_id, "TestUser1");
    let mut second = test_user(type_id, "TestUser2");
    second.is_approved = false;
    let mut third = test_user(type_id, "TestUser3");
    {
        let mut uow = store.unit_of_work();
        uow.users().add_or_update(&mut first).unwrap();
        uow.users().add_or_update(&mut second).unwrap();
        uow.users().add_or_update(&mut third).unwrap();
        uow.commit().unwrap();
    }

    let either = Query::eq(UserField::Username, "TestUser1")
        .or(Query::eq(UserField::Username, "TestUser2"));
    let approved_either = either
        .clone()
        .and(Query::eq(UserField::IsApproved, true));

    let mut uow = store.unit_of_work();
    let users = uow.users();
    let count = users.count(&either).unwrap();
    assert!(count >= 2);
    assert_eq!(count, users.get_by_query(&either).unwrap().len() as u64);

    let approved = users.get_by_query(&approved_either).unwrap();
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].username, "TestUser1");
    assert_eq!(users.count(&approved_either).unwrap(), 1);

    assert_eq!(users.count(&Query::all()).unwrap(), 3);
    assert_eq!(
        users
            .count(&Query::eq(UserField::Username, "nobody"))
            .unwrap(),
        0
    );
}

#[test]
fn user_types_round_trip_and_query_by_alias() {
    let (mut store, type_id) = seeded_store();
    let mut loaded = store
        .unit_of_work()
        .user_types()
        .get(type_id)
        .unwrap()
        .unwrap();
    assert_eq!(loaded.alias, "admin");
    assert!(!loaded.is_dirty());

    loaded.permissions = "CADMOSKTPIURZ:5F7".to_string();
    {
        let mut uow = store.unit_of_work();
        uow.user_types().add_or_update(&mut loaded).unwrap();
        assert_eq!(uow.commit().unwrap().updated, 1);
    }

    let found = store
        .unit_of_work()
        .user_types()
        .get_by_query(&Query::eq(UserTypeField::Alias, "admin"))
        .unwrap();
    assert_eq!(found, vec![loaded]);
}

#[test]
fn get_all_with_more_ids_than_sqlite_binds_is_empty() {
    let (mut store, _) = seeded_store();
    let ids = (1_000_000..1_040_000).collect::<Vec<i64>>();
    let found = store.unit_of_work().users().get_all(&ids).unwrap();
    assert!(found.is_empty());
}

#[test]
fn get_all_across_chunks_dedups_and_sorts_by_id() {
    let (mut store, type_id) = seeded_store();
    let mut users = vec![
        test_user(type_id, "early"),
        test_user(type_id, "middle"),
        test_user(type_id, "late"),
    ];
    {
        let mut uow = store.unit_of_work();
        for user in users.iter_mut() {
            uow.users().add_or_update(user).unwrap();
        }
        uow.commit().unwrap();
    }
    let existing = users.iter().filter_map(User::id).collect::<Vec<_>>();

    let mut ids = (500_000..501_200).rev().collect::<Vec<i64>>();
    ids.insert(0, existing[2]);
    ids.insert(700, existing[0]);
    ids.push(existing[1]);
    ids.push(existing[0]);

    let found = store.unit_of_work().users().get_all(&ids).unwrap();
    let found_ids = found.iter().filter_map(User::id).collect::<Vec<_>>();
    assert_eq!(found_ids, existing);
}

#[test]
fn queries_over_many_usernames_count_and_load() {
    let (mut store, type_id) = seeded_store();
    let mut first = test_user(type_id, "TestUser1");
    let mut second = test_user(type_id, "TestUser2");
    second.is_approved = false;
    {
        let mut uow = store.unit_of_work();
        uow.users().add_or_update(&mut first).unwrap();
        uow.users().add_or_update(&mut second).unwrap();
        uow.commit().unwrap();
    }

    let mut names = (0..1_500).map(|i| format!("ghost{i}")).collect::<Vec<_>>();
    names.insert(300, "TestUser2".to_string());
    names.push("TestUser1".to_string());
    let any_name = Query::any_of(UserField::Username, &names).unwrap();
    let approved = any_name
        .clone()
        .and(Query::eq(UserField::IsApproved, true));

    let mut uow = store.unit_of_work();
    let users = uow.users();
    assert_eq!(users.count(&any_name).unwrap(), 2);
    let found = users.get_by_query(&any_name).unwrap();
    assert_eq!(found, vec![first.clone(), second]);

    assert_eq!(users.count(&approved).unwrap(), 1);
    assert_eq!(users.get_by_query(&approved).unwrap(), vec![first]);
}

#[derive(Clone, Copy)]
enum Edit {
    Add(&'static str),
    Remove(&'static str),
}

#[test]
fn section_edit_sequences_persist_their_net_set() {
    use std::collections::BTreeSet;
    use Edit::{Add, Remove};

    let cases: &[(&[&str], &[Edit], &[&str])] = &[
        (
            &["content", "media"],
            &[Remove("content"), Remove("content"), Add("content"), Remove("content")],
            &["media"],
        ),
        (
            &["content"],
            &[Add("settings"), Add("settings"), Remove("settings"), Add("settings")],
            &["content", "settings"],
        ),
        (&[], &[Add("media"), Remove("media")], &[]),
        (&["media"], &[Remove("media"), Add("media")], &["media"]),
        (
            &["content", "media"],
            &[Remove("content"), Remove("media"), Add("users"), Add("users")],
            &["users"],
        ),
        (&["translation"], &[Remove("developer"), Add("translation")], &["translation"]),
    ];

    let (mut store, type_id) = seeded_store();
    for (index, (initial, edits, expected)) in cases.iter().enumerate() {
        let folded = edits.iter().fold(
            initial.iter().copied().collect::<BTreeSet<_>>(),
            |mut set, edit| {
                match edit {
                    Add(section) => set.insert(*section),
                    Remove(section) => set.remove(section),
                };
                set
            },
        );
        assert_eq!(folded.into_iter().collect::<Vec<_>>(), *expected, "case {index}");
        let apply = |user: &mut User| {
            for edit in edits.iter() {
                match edit {
                    Add(section) => user.add_allowed_section(section),
                    Remove(section) => user.remove_allowed_section(section),
                };
            }
        };

        let mut persisted = test_user(type_id, &format!("persisted{index}"));
        for section in initial.iter() {
            persisted.add_allowed_section(section);
        }
        let persisted_id = persist(&mut store, &mut persisted);
        let mut loaded = load(&mut store, persisted_id);
        apply(&mut loaded);
        assert_eq!(loaded.is_dirty(), initial != expected, "case {index}");
        {
            let mut uow = store.unit_of_work();
            uow.users().add_or_update(&mut loaded).unwrap();
            uow.commit().unwrap();
        }

        let mut fresh = test_user(type_id, &format!("fresh{index}"));
        for section in initial.iter() {
            fresh.add_allowed_section(section);
        }
        apply(&mut fresh);
        let fresh_id = persist(&mut store, &mut fresh);

        for id in [persisted_id, fresh_id] {
            let reloaded = load(&mut store, id);
            assert_eq!(
                reloaded.allowed_sections().collect::<Vec<_>>(),
                *expected,
                "case {index} user {id}"
            );
            assert_eq!(section_rows(&store, id), expected.len() as i64);
        }
    }
}

#[test]
fn batch_commits_only_staged_users_with_their_own_diffs() {
    let (mut store, type_id) = seeded_store();
    let mut seeded = ["TestUser1", "TestUser2", "TestUser3"]
        .map(|username| {
            let mut user = test_user(type_id, username);
            user.add_allowed_section("content");
            user.add_allowed_section("media");
            user
        });
    {
        let mut uow = store.unit_of_work();
        for user in seeded.iter_mut() {
            uow.users().add_or_update(user).unwrap();
        }
        uow.commit().unwrap();
    }
    let ids = seeded.iter().filter_map(User::id).collect::<Vec<_>>();

    let loaded = store.unit_of_work().users().get_all(&ids).unwrap();
    let [mut first, mut second, mut third]: [User; 3] = loaded.try_into().unwrap();
    first.add_allowed_section("settings");
    first.add_allowed_section("settings");
    first.remove_allowed_section("settings");
    first.add_allowed_section("settings");
    second.add_allowed_section("developer");
    third.add_allowed_section("content");
    third.add_allowed_section("translation");
    assert!(third.is_dirty());

    {
        let mut uow = store.unit_of_work();
        uow.users().add_or_update(&mut first).unwrap();
        uow.users().add_or_update(&mut second).unwrap();
        let summary = uow.commit().unwrap();
        assert_eq!(summary.updated, 2);
        assert_eq!(summary.members_inserted, 2);
        assert_eq!(summary.members_deleted, 0);
    }
    assert!(!first.is_dirty());
    assert!(!second.is_dirty());
    assert!(third.is_dirty());

    let reloaded = store.unit_of_work().users().get_all(&ids).unwrap();
    let sections = reloaded
        .iter()
        .map(|user| user.allowed_sections().collect::<Vec<_>>())
        .collect::<Vec<_>>();
    assert_eq!(
        sections,
        vec![
            vec!["content", "media", "settings"],
            vec!["content", "developer", "media"],
            vec!["content", "media"],
        ]
    );
}
