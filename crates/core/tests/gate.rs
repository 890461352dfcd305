mod support;

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use futures_util::future::join_all;
use pointmap_core::resource::{
    fetcher::{AssetLoader, FetchError, LoadedAsset},
    gate::{GateError, ResourceGate, ResourceState},
    reference::ResourceReference,
};
use tokio_util::sync::CancellationToken;

use support::{CountingLoader, test_bundle};

fn script() -> ResourceReference {
    ResourceReference::script("https://cdn.test/map.js")
}

#[tokio::test]
async fn concurrent_ensure_loads_once() {
    let gate = ResourceGate::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let reference = script();

    let waiters = (0..16).map(|_| {
        let gate = gate.clone();
        let calls = Arc::clone(&calls);
        let reference = reference.clone();
        tokio::spawn(async move {
            gate.ensure(
                &reference,
                |r| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let r = r.clone();
                    async move {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(LoadedAsset::new(r, "L"))
                    }
                },
                &CancellationToken::new(),
            )
            .await
        })
    });

    let results: Vec<_> = join_all(waiters)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(results.len(), 16);
    assert!(results.iter().all(|asset| Arc::ptr_eq(asset, &results[0])));
}

#[tokio::test]
async fn ready_resource_resolves_without_loader() {
    let gate = ResourceGate::new();
    let loader = CountingLoader::open();
    let cancel = CancellationToken::new();

    let first = gate.ensure(&script(), |r| loader.load(r), &cancel).await.unwrap();
    let second = gate.ensure(&script(), |r| loader.load(r), &cancel).await.unwrap();

    assert_eq!(loader.calls(), 1);
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn failure_is_shared_until_reset() {
    let gate = ResourceGate::new();
    let loader = CountingLoader::failing();
    let cancel = CancellationToken::new();

    let first = gate.ensure(&script(), |r| loader.load(r), &cancel).await;
    let second = gate.ensure(&script(), |r| loader.load(r), &cancel).await;

    assert!(matches!(first, Err(GateError::Load(ref e)) if matches!(**e, FetchError::NotFound(_))));
    assert!(matches!(second, Err(GateError::Load(_))));
    assert_eq!(loader.calls(), 1);
    assert!(matches!(gate.state(script().id()), ResourceState::Failed(_)));

    assert!(gate.reset(script().id()));
    let _ = gate.ensure(&script(), |r| loader.load(r), &cancel).await;
    assert_eq!(loader.calls(), 2);
}

#[tokio::test]
async fn cancelled_waiter_does_not_abort_the_load() {
    let gate = ResourceGate::new();
    let loader = CountingLoader::gated();
    let cancel = CancellationToken::new();

    let waiter = {
        let gate = gate.clone();
        let loader = Arc::clone(&loader);
        let cancel = cancel.clone();
        tokio::spawn(async move { gate.ensure(&script(), |r| loader.load(r), &cancel).await })
    };

    while !matches!(gate.state(script().id()), ResourceState::Attaching) {
        tokio::task::yield_now().await;
    }
    cancel.cancel();
    assert!(matches!(waiter.await.unwrap(), Err(GateError::Cancelled)));

    loader.release(1);
    let asset = gate
        .ensure(&script(), |r| loader.load(r), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(asset.reference().id(), script().id());
    assert_eq!(loader.calls(), 1);
}

#[tokio::test]
async fn panicking_load_is_abandoned() {
    let gate = ResourceGate::new();

    let result = gate
        .ensure(
            &script(),
            |r| {
                let r = r.clone();
                async move {
                    if r.id().ends_with(".js") {
                        panic!("loader exploded");
                    }
                    Ok(LoadedAsset::new(r, ""))
                }
            },
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(result, Err(GateError::Abandoned(ref url)) if url == script().id()));

    let state = gate.state(script().id());
    assert!(matches!(state, ResourceState::Abandoned));
    assert!(state.is_settled());

    let again = gate
        .ensure(&script(), |r| CountingLoader::open().load(r), &CancellationToken::new())
        .await;
    assert!(matches!(again, Err(GateError::Abandoned(_))));
}

#[tokio::test]
async fn cancelled_token_starts_no_load() {
    let gate = ResourceGate::new();
    let loader = CountingLoader::open();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = gate.ensure(&script(), |r| loader.load(r), &cancel).await;

    assert!(matches!(result, Err(GateError::Cancelled)));
    assert_eq!(loader.calls(), 0);
    assert!(matches!(gate.state(script().id()), ResourceState::Unattached));
}

#[tokio::test]
async fn bundle_stops_at_first_failure() {
    struct StylesheetFails;

    impl AssetLoader for StylesheetFails {
        fn load(
            &self,
            reference: &ResourceReference,
        ) -> futures_util::future::BoxFuture<'static, Result<LoadedAsset, FetchError>> {
            let url = reference.id().to_string();
            Box::pin(async move { Err::<LoadedAsset, _>(FetchError::Network(format!("refused {url}"))) })
        }
    }

    let gate = ResourceGate::new();
    let bundle = test_bundle();
    let result = gate
        .ensure_bundle(&bundle, &StylesheetFails, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(GateError::Load(_))));
    let [stylesheet, js] = bundle.resources() else {
        panic!("bundle should hold two resources");
    };
    assert!(matches!(gate.state(stylesheet.id()), ResourceState::Failed(_)));
    assert!(matches!(gate.state(js.id()), ResourceState::Unattached));
}

#[tokio::test]
async fn bundle_attaches_in_order() {
    let gate = ResourceGate::new();
    let loader = CountingLoader::open();

    let attached = gate
        .ensure_bundle(&test_bundle(), loader.as_ref(), &CancellationToken::new())
        .await
        .unwrap();

    let urls: Vec<_> = attached.iter().map(|a| a.reference().id()).collect();
    assert_eq!(urls, vec!["https://cdn.test/map.css", "https://cdn.test/map.js"]);
    assert_eq!(attached.bundle_id(), "test");
    assert_eq!(loader.calls(), 2);
}
