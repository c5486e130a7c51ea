use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use batchload_rs::{BatchFunction, BatchResult, LoadError, Loader};
use futures::future;

#[derive(Debug, PartialEq, Eq, Clone)]
struct DummyData(String);

struct DummyContext {
    map: HashMap<i64, String>,
}

struct DummyDataLoader;

#[async_trait]
impl BatchFunction<i64, DummyData> for DummyDataLoader {
    type Context = DummyContext;
    type Error = String;

    async fn load(keys: &[i64], context: &DummyContext) -> BatchResult<DummyData, String> {
        Ok(keys
            .iter()
            .map(|k| {
                context.map.get(k).cloned().map(DummyData).ok_or_else(|| format!("no value for {}", k))
            })
            .collect())
    }
}

fn missing(key: i64) -> LoadError<String> {
    LoadError::Rejected(Arc::new(format!("no value for {}", key)))
}

#[tokio::test]
async fn basic_load() {
    let mut context = DummyContext { map: HashMap::new() };
    context.map.insert(42, "Foo".to_owned());

    let loader = Loader::new(DummyDataLoader {}, context);
    assert_eq!(loader.load(42).await, Ok(DummyData("Foo".to_owned())));
}

#[tokio::test]
async fn repeated_load() {
    let mut context = DummyContext { map: HashMap::new() };
    context.map.insert(42, "Foo".to_owned());

    let loader = Loader::new(DummyDataLoader {}, context);
    assert_eq!(loader.load(42).await, Ok(DummyData("Foo".to_owned())));
    assert_eq!(loader.load(42).await, Ok(DummyData("Foo".to_owned())));
}

#[tokio::test]
async fn missing_load() {
    let loader = Loader::new(DummyDataLoader {}, DummyContext { map: HashMap::new() });
    assert_eq!(loader.load(7).await, Err(missing(7)));
}

#[tokio::test]
async fn basic_load_many() {
    let mut context = DummyContext { map: HashMap::new() };
    context.map.insert(42, "one fish".to_owned());
    context.map.insert(12, "two fish".to_owned());
    context.map.insert(5, "red fish".to_owned());
    context.map.insert(8, "blue fish".to_owned());

    let loader = Loader::new(DummyDataLoader {}, context);
    assert_eq!(
        loader.load_many(vec![5, 12, 77, 8]).await,
        vec![
            Ok(DummyData("red fish".to_owned())),
            Ok(DummyData("two fish".to_owned())),
            Err(missing(77)),
            Ok(DummyData("blue fish".to_owned()))
        ]
    );
}

#[tokio::test]
async fn load_async() {
    let mut context = DummyContext { map: HashMap::new() };
    context.map.insert(42, "one fish".to_owned());
    context.map.insert(12, "two fish".to_owned());
    context.map.insert(5, "red fish".to_owned());
    context.map.insert(8, "blue fish".to_owned());

    let loader = Loader::new(DummyDataLoader {}, context);

    let tuple = future::join4(
        loader.load(5),
        loader.load_many(vec![5, 42]),
        loader.load(99),
        loader.load(12),
    );

    assert_eq!(
        tuple.await,
        (
            Ok(DummyData("red fish".to_owned())),
            vec![Ok(DummyData("red fish".to_owned())), Ok(DummyData("one fish".to_owned())),],
            Err(missing(99)),
            Ok(DummyData("two fish".to_owned()))
        )
    );
}

#[tokio::test]
async fn dropping_loader_cancels_pending_requests() {
    let loader = Loader::new(DummyDataLoader {}, DummyContext { map: HashMap::new() });

    let one = loader.load(1);
    let many = loader.load_many(vec![2, 3]);
    drop(loader);

    assert_eq!(one.await, Err(LoadError::Canceled));
    assert_eq!(many.await, vec![Err(LoadError::Canceled), Err(LoadError::Canceled)]);
}
