#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tuplemap_core::{
    open_store_in_memory, FieldType, IndexDef, Repository, SqliteTupleClient, Space,
    StandardFormatter, StoreError, StoreResult, Tuple, TupleClient, UpdateOp, Value,
};

pub const USERS_SPACE_ID: u32 = 512;

/// Store wrapper that counts remote calls and can fail the next select.
pub struct RecordingClient {
    inner: SqliteTupleClient,
    pub selects: Cell<usize>,
    pub inserts: Cell<usize>,
    pub updates: Cell<usize>,
    pub last_update: RefCell<Option<(Vec<Value>, Vec<UpdateOp>)>>,
    fail_next_select: Cell<bool>,
}

impl RecordingClient {
    pub fn new(spaces: &[&Space]) -> Rc<Self> {
        let inner = open_store_in_memory().unwrap();
        for space in spaces {
            inner.define_space(space).unwrap();
        }
        Rc::new(Self {
            inner,
            selects: Cell::new(0),
            inserts: Cell::new(0),
            updates: Cell::new(0),
            last_update: RefCell::new(None),
            fail_next_select: Cell::new(false),
        })
    }

    /// Writes straight to the store without counting.
    pub fn seed(&self, space_id: u32, tuple: Tuple) {
        self.inner.insert(space_id, &tuple).unwrap();
    }

    /// Changes a stored row behind the repository's back.
    pub fn overwrite(&self, space_id: u32, key: &[Value], operations: &[UpdateOp]) {
        self.inner.update(space_id, key, operations).unwrap();
    }

    pub fn stored(&self, space_id: u32) -> usize {
        self.inner.count(space_id).unwrap()
    }

    pub fn writes(&self) -> usize {
        self.inserts.get() + self.updates.get()
    }

    pub fn fail_next_select(&self) {
        self.fail_next_select.set(true);
    }
}

impl TupleClient for RecordingClient {
    fn select(&self, space_id: u32, values: &[Value], index: &IndexDef) -> StoreResult<Vec<Tuple>> {
        self.selects.set(self.selects.get() + 1);
        if self.fail_next_select.replace(false) {
            return Err(StoreError::Rejected("connection reset".to_string()));
        }
        self.inner.select(space_id, values, index)
    }

    fn insert(&self, space_id: u32, tuple: &Tuple) -> StoreResult<()> {
        self.inserts.set(self.inserts.get() + 1);
        self.inner.insert(space_id, tuple)
    }

    fn update(&self, space_id: u32, key: &[Value], operations: &[UpdateOp]) -> StoreResult<()> {
        self.updates.set(self.updates.get() + 1);
        *self.last_update.borrow_mut() = Some((key.to_vec(), operations.to_vec()));
        self.inner.update(space_id, key, operations)
    }
}

/// `users(id unsigned, name string, active boolean, email string)` with a
/// primary index on `id` and a secondary index on `email`.
pub fn users_space() -> Space {
    Space::builder(USERS_SPACE_ID, "users")
        .field("id", FieldType::Unsigned)
        .field("name", FieldType::String)
        .field("active", FieldType::Boolean)
        .field("email", FieldType::String)
        .index("primary", &["id"])
        .index("email", &["email"])
        .build()
        .unwrap()
}

pub fn user_tuple(id: i64, name: &str, active: bool, email: &str) -> Tuple {
    vec![
        Value::Int(id),
        Value::from(name),
        Value::Bool(active),
        Value::from(email),
    ]
}

pub fn users_repository() -> (Rc<RecordingClient>, Repository) {
    let space = users_space();
    let client = RecordingClient::new(&[&space]);
    let repository = Repository::new(
        Rc::new(space),
        Rc::new(StandardFormatter),
        Rc::clone(&client) as Rc<dyn TupleClient>,
    );
    (client, repository)
}
