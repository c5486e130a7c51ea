#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use batchload_rs::{BatchFunction, BatchResult, Loader};
use tokio::sync::Semaphore;

/// Remembers the keys of every batch function call, in call order.
pub struct Recorder<K> {
    batches: Mutex<Vec<Vec<K>>>,
}

impl<K: Clone> Recorder<K> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { batches: Mutex::new(Vec::new()) })
    }

    pub fn record(&self, keys: &[K]) {
        self.batches.lock().unwrap().push(keys.to_vec());
    }

    pub fn batches(&self) -> Vec<Vec<K>> {
        self.batches.lock().unwrap().clone()
    }
}

/// Loads every key as twice its value.
pub struct Doubler;

#[async_trait]
impl BatchFunction<u64, u64> for Doubler {
    type Context = Arc<Recorder<u64>>;
    type Error = String;

    async fn load(keys: &[u64], recorder: &Self::Context) -> BatchResult<u64, String> {
        recorder.record(keys);
        Ok(keys.iter().map(|k| Ok(k * 2)).collect())
    }
}

/// Loads even keys as themselves and rejects odd ones.
pub struct EvenOnly;

#[async_trait]
impl BatchFunction<u64, u64> for EvenOnly {
    type Context = Arc<Recorder<u64>>;
    type Error = String;

    async fn load(keys: &[u64], recorder: &Self::Context) -> BatchResult<u64, String> {
        recorder.record(keys);
        Ok(keys
            .iter()
            .map(|&k| if k % 2 == 0 { Ok(k) } else { Err(format!("Odd: {}", k)) })
            .collect())
    }
}

/// Fails every call as a whole.
pub struct Unavailable;

#[async_trait]
impl BatchFunction<u64, u64> for Unavailable {
    type Context = Arc<Recorder<u64>>;
    type Error = String;

    async fn load(keys: &[u64], recorder: &Self::Context) -> BatchResult<u64, String> {
        recorder.record(keys);
        Err("backend unavailable".to_owned())
    }
}

/// Returns one value fewer than it was asked for.
pub struct DropsLast;

#[async_trait]
impl BatchFunction<u64, u64> for DropsLast {
    type Context = Arc<Recorder<u64>>;
    type Error = String;

    async fn load(keys: &[u64], recorder: &Self::Context) -> BatchResult<u64, String> {
        recorder.record(keys);
        Ok(keys.iter().skip(1).map(|&k| Ok(k)).collect())
    }
}

/// Upper-cases names.
pub struct Shout;

#[async_trait]
impl BatchFunction<String, String> for Shout {
    type Context = Arc<Recorder<String>>;
    type Error = String;

    async fn load(keys: &[String], recorder: &Self::Context) -> BatchResult<String, String> {
        recorder.record(keys);
        Ok(keys.iter().map(|k| Ok(k.to_uppercase())).collect())
    }
}

/// Blocks each call until a permit is released, then loads `key * 100 + call number`.
pub struct Gated;

pub struct Gate {
    pub calls: AtomicU64,
    pub permits: Semaphore,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { calls: AtomicU64::new(0), permits: Semaphore::new(0) })
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BatchFunction<u64, u64> for Gated {
    type Context = Arc<Gate>;
    type Error = String;

    async fn load(keys: &[u64], gate: &Self::Context) -> BatchResult<u64, String> {
        let call = gate.calls.fetch_add(1, Ordering::SeqCst) + 1;
        gate.permits.acquire().await.map_err(|e| e.to_string())?.forget();
        Ok(keys.iter().map(|k| Ok(k * 100 + call)).collect())
    }
}

/// Resolves keys through another loader and adds one.
pub struct Composed;

pub struct Inner {
    pub loader: Loader<u64, u64, String>,
    pub recorder: Arc<Recorder<u64>>,
}

#[async_trait]
impl BatchFunction<u64, u64> for Composed {
    type Context = Inner;
    type Error = String;

    async fn load(keys: &[u64], inner: &Inner) -> BatchResult<u64, String> {
        inner.recorder.record(keys);
        let values = inner.loader.load_many(keys.to_vec()).await;
        Ok(values.into_iter().map(|v| v.map(|v| v + 1).map_err(|e| e.to_string())).collect())
    }
}

/// Fails any call that includes key 3; otherwise doubles every key.
pub struct FailsOnThree;

#[async_trait]
impl BatchFunction<u64, u64> for FailsOnThree {
    type Context = Arc<Recorder<u64>>;
    type Error = String;

    async fn load(keys: &[u64], recorder: &Self::Context) -> BatchResult<u64, String> {
        recorder.record(keys);
        if keys.contains(&3) {
            return Err("key 3 unavailable".to_owned());
        }
        Ok(keys.iter().map(|k| Ok(k * 2)).collect())
    }
}
