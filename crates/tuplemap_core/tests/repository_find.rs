mod common;

use common::{user_tuple, users_repository, USERS_SPACE_ID};
use std::rc::Rc;
use tuplemap_core::{MapperError, Params, UpdateOp, Value};

#[test]
fn get_instance_returns_same_record_for_same_key() {
    let (_client, mut repo) = users_repository();

    let first = repo
        .get_instance(user_tuple(1, "ada", true, "ada@example.com"))
        .unwrap();
    let second = repo
        .get_instance(user_tuple(1, "ada", true, "ada@example.com"))
        .unwrap();

    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(repo.persisted_count(), 1);
    assert!(repo.knows(&first));
}

#[test]
fn get_instance_maps_missing_positions_to_null() {
    let (_client, mut repo) = users_repository();

    let record = repo.get_instance(vec![Value::Int(3)]).unwrap();
    let record = record.borrow();
    assert_eq!(record.get("id"), Some(&Value::Int(3)));
    assert_eq!(record.get("email"), Some(&Value::Null));
}

#[test]
fn repeated_find_issues_one_select() {
    let (client, mut repo) = users_repository();
    client.seed(USERS_SPACE_ID, user_tuple(1, "ada", true, "ada@example.com"));

    let params = Params::from([("email", "ada@example.com")]);
    let first = repo.find(params.clone()).unwrap();
    let second = repo.find(params).unwrap();

    assert_eq!(client.selects.get(), 1);
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert!(Rc::ptr_eq(&first[0], &second[0]));
}

#[test]
fn empty_result_is_cached_too() {
    let (client, mut repo) = users_repository();

    assert!(repo
        .find_one(Params::from([("email", "nobody@example.com")]))
        .unwrap()
        .is_none());
    assert!(repo
        .find_one(Params::from([("email", "nobody@example.com")]))
        .unwrap()
        .is_none());
    assert_eq!(client.selects.get(), 1);
}

#[test]
fn find_and_find_one_are_cached_separately() {
    let (client, mut repo) = users_repository();
    client.seed(USERS_SPACE_ID, user_tuple(1, "ada", true, "ada@example.com"));

    let params = Params::from([("email", "ada@example.com")]);
    let many = repo.find(params.clone()).unwrap();
    let one = repo.find_one(params).unwrap().unwrap();

    assert_eq!(client.selects.get(), 2);
    assert!(Rc::ptr_eq(&many[0], &one));
}

#[test]
fn scalar_shorthand_shares_cache_slot_with_named_primary_key() {
    let (client, mut repo) = users_repository();

    assert!(repo.find(99_i64).unwrap().is_empty());
    assert!(repo.find(Params::from([("id", 99_i64)])).unwrap().is_empty());
    assert!(repo.find(vec![Value::Int(99)]).unwrap().is_empty());

    assert_eq!(client.selects.get(), 1);
    assert_eq!(repo.cached_queries(), 1);
}

#[test]
fn scalar_shorthand_and_named_key_resolve_to_same_record() {
    let (client, mut repo) = users_repository();
    client.seed(USERS_SPACE_ID, user_tuple(5, "eve", false, "eve@example.com"));

    let by_scalar = repo.find_one(5_i64).unwrap().unwrap();
    let by_name = repo.find_one(Params::from([("id", 5_i64)])).unwrap().unwrap();

    assert!(Rc::ptr_eq(&by_scalar, &by_name));
    assert_eq!(client.selects.get(), 1);
}

#[test]
fn scalar_that_does_not_survive_coercion_has_no_index() {
    let (client, mut repo) = users_repository();

    let err = repo.find("5").unwrap_err();
    assert!(matches!(err, MapperError::NoIndex { .. }));
    assert_eq!(client.selects.get(), 0);
}

#[test]
fn identity_map_answers_primary_key_lookups_without_select() {
    let (client, mut repo) = users_repository();
    client.seed(USERS_SPACE_ID, user_tuple(1, "ada", true, "ada@example.com"));

    let by_email = repo
        .find_one(Params::from([("email", "ada@example.com")]))
        .unwrap()
        .unwrap();
    let by_id = repo.find(Params::from([("id", 1_i64)])).unwrap();

    assert_eq!(client.selects.get(), 1);
    assert_eq!(by_id.len(), 1);
    assert!(Rc::ptr_eq(&by_email, &by_id[0]));
}

#[test]
fn unknown_field_has_no_index_and_no_remote_call() {
    let (client, mut repo) = users_repository();

    let err = repo
        .find(Params::from([("nonexistent", 1_i64)]))
        .unwrap_err();
    match err {
        MapperError::NoIndex { space, params } => {
            assert_eq!(space, "users");
            assert_eq!(params, r#"{"nonexistent":1}"#);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(client.selects.get(), 0);
}

#[test]
fn non_prefix_constraints_have_no_index() {
    let (client, mut repo) = users_repository();

    let err = repo
        .find(Params::from([("name", "ada")]))
        .unwrap_err();
    assert!(matches!(err, MapperError::NoIndex { .. }));
    assert_eq!(client.selects.get(), 0);
}

#[test]
fn empty_params_scan_primary_index_and_are_cached() {
    let (client, mut repo) = users_repository();
    client.seed(USERS_SPACE_ID, user_tuple(1, "ada", true, "ada@example.com"));
    client.seed(USERS_SPACE_ID, user_tuple(2, "bob", false, "bob@example.com"));

    let all = repo.find(Params::new()).unwrap();
    let again = repo.find(Params::new()).unwrap();

    assert_eq!(all.len(), 2);
    assert_eq!(all[0].borrow().get("name"), Some(&Value::from("ada")));
    assert_eq!(all[1].borrow().get("name"), Some(&Value::from("bob")));
    assert_eq!(again.len(), 2);
    assert_eq!(client.selects.get(), 1);
}

#[test]
fn cached_record_wins_over_diverged_store_value() {
    let (client, mut repo) = users_repository();
    client.seed(USERS_SPACE_ID, user_tuple(1, "ada", true, "ada@example.com"));

    let first = repo.find_one(1_i64).unwrap().unwrap();
    client.overwrite(
        USERS_SPACE_ID,
        &[Value::Int(1)],
        &[UpdateOp::Assign {
            position: 1,
            value: Value::from("changed remotely"),
        }],
    );

    let refetched = repo
        .find_one(Params::from([("email", "ada@example.com")]))
        .unwrap()
        .unwrap();

    assert_eq!(client.selects.get(), 2);
    assert!(Rc::ptr_eq(&first, &refetched));
    assert_eq!(refetched.borrow().get("name"), Some(&Value::from("ada")));
}

#[test]
fn failed_select_does_not_poison_cache() {
    let (client, mut repo) = users_repository();
    client.seed(USERS_SPACE_ID, user_tuple(1, "ada", true, "ada@example.com"));
    let params = Params::from([("email", "ada@example.com")]);

    client.fail_next_select();
    let err = repo.find(params.clone()).unwrap_err();
    assert!(matches!(err, MapperError::Store(_)));
    assert_eq!(repo.cached_queries(), 0);

    let records = repo.find(params).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(client.selects.get(), 2);
}

#[test]
fn find_or_fail_reports_params() {
    let (_client, mut repo) = users_repository();

    let err = repo
        .find_or_fail(Params::from([("email", "ghost@example.com")]))
        .unwrap_err();
    match err {
        MapperError::NotFound { space, params } => {
            assert_eq!(space, "users");
            assert!(params.contains("ghost@example.com"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
