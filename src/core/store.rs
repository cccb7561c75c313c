use std::collections::HashMap;
use std::sync::RwLock;

/// One staged write.
#[derive(Debug, Clone)]
pub enum WriteOp {
    Put(String, Vec<u8>),
    Delete(String),
}

/// Raw document storage. Values are JSON bytes; typing happens in `Db`.
pub trait DocumentStore: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;

    fn delete(&self, key: &str) -> anyhow::Result<()>;

    /// Apply a batch of writes. The default applies them in order.
    fn apply(&self, ops: Vec<WriteOp>) -> anyhow::Result<()> {
        for op in ops {
            match op {
                WriteOp::Put(key, value) => self.set(&key, &value)?,
                WriteOp::Delete(key) => self.delete(&key)?,
            }
        }
        Ok(())
    }
}

/// In-process store used by the native server and the tests.
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.read().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> anyhow::Error {
    anyhow::anyhow!("memory store lock poisoned")
}

impl DocumentStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let docs = self.docs.read().map_err(|_| poisoned())?;
        Ok(docs.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        let mut docs = self.docs.write().map_err(|_| poisoned())?;
        docs.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut docs = self.docs.write().map_err(|_| poisoned())?;
        docs.remove(key);
        Ok(())
    }

    // Whole batch under one write guard: readers see all of it or none of it.
    fn apply(&self, ops: Vec<WriteOp>) -> anyhow::Result<()> {
        let mut docs = self.docs.write().map_err(|_| poisoned())?;
        for op in ops {
            match op {
                WriteOp::Put(key, value) => {
                    docs.insert(key, value);
                }
                WriteOp::Delete(key) => {
                    docs.remove(&key);
                }
            }
        }
        Ok(())
    }
}

/// Spin key-value store. The store is opened per call, as a component
/// instance only lives for one request.
pub struct SpinStore {
    label: String,
}

impl SpinStore {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }

    fn open(&self) -> anyhow::Result<spin_sdk::key_value::Store> {
        Ok(spin_sdk::key_value::Store::open(&self.label)?)
    }
}

impl DocumentStore for SpinStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.open()?.get(key)?)
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.open()?.set(key, value)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.open()?.delete(key)?;
        Ok(())
    }
}
