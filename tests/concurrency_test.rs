use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cachecall::cache::{CacheStore, FileStore, InMemoryStore};
use cachecall::cached::CachedCall;
use cachecall::client::Client;
use cachecall::codec::Utf8Codec;
use cachecall::exec::WorkerPool;
use cachecall::executor::Affinity;
use cachecall::factory::CachedCallFactory;
use cachecall::http::{Method, Request, Response};
use httpmock::prelude::*;
use tempfile::TempDir;

const CLONES: usize = 16;
const TIMEOUT: Duration = Duration::from_secs(10);

fn base_call(factory: &CachedCallFactory, client: &Client, url: &str) -> CachedCall<String> {
    factory.adapt(
        Box::new(client.call(Request::new(url, Method::GET), Arc::new(Utf8Codec))),
        Arc::new(Utf8Codec),
    )
}

/// Each clone does one of enqueue, refresh or remove on the same key from
/// its own thread. Every callback must fire exactly once and the store must
/// end up either without the entry or with the server's body.
fn race_on_one_key(store: Arc<dyn CacheStore>) {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/race");
        then.status(200).body("body");
    });
    let pool = Arc::new(WorkerPool::new(4).unwrap());
    let factory = CachedCallFactory::builder()
        .store(store.clone())
        .pool(pool.clone())
        .build()
        .unwrap();
    let client = Client::new(pool, TIMEOUT);
    let call = base_call(&factory, &client, &server.url("/race"));

    let fired = Arc::new(AtomicUsize::new(0));
    let (sender, receiver) = channel();
    let handles: Vec<_> = (0..CLONES)
        .map(|i| {
            let call = call.clone();
            let fired = fired.clone();
            let sender = sender.clone();
            thread::spawn(move || {
                let callback = {
                    let fired = fired.clone();
                    let sender = sender.clone();
                    Box::new(move |result: cachecall::Result<Response<String>>| {
                        fired.fetch_add(1, Ordering::SeqCst);
                        sender.send(result.is_ok()).unwrap();
                    })
                };
                match i % 3 {
                    0 => call.enqueue(callback).unwrap(),
                    1 => call.refresh(callback).unwrap(),
                    _ => {
                        call.remove().unwrap();
                        fired.fetch_add(1, Ordering::SeqCst);
                        sender.send(true).unwrap();
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    for _ in 0..CLONES {
        assert!(receiver.recv_timeout(TIMEOUT).unwrap());
    }
    // nothing fires twice
    assert!(receiver.recv_timeout(Duration::from_millis(200)).is_err());
    assert_eq!(CLONES, fired.load(Ordering::SeqCst));

    let key = call.key().as_str().to_string();
    match store.get(&key).unwrap() {
        None => {}
        Some(value) => assert_eq!(b"body".to_vec(), value),
    }
    assert!(store.size().unwrap() <= 1);
}

#[test]
fn test_clones_race_on_in_memory_store() {
    race_on_one_key(Arc::new(InMemoryStore::new()));
}

#[test]
fn test_clones_race_on_file_store() {
    let temp_dir = TempDir::new().unwrap();
    race_on_one_key(Arc::new(FileStore::new(temp_dir.path())));
}

#[test]
fn test_callbacks_run_on_affinity_thread() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/affinity");
        then.status(200).body("body");
    });
    let pool = Arc::new(WorkerPool::new(2).unwrap());
    let affinity = Arc::new(Affinity::new("cachecall-test-main").unwrap());
    let factory = CachedCallFactory::builder()
        .store(Arc::new(InMemoryStore::new()))
        .executor(affinity.clone())
        .pool(pool.clone())
        .build()
        .unwrap();
    let client = Client::new(pool, TIMEOUT);
    let call = base_call(&factory, &client, &server.url("/affinity"));

    let (sender, receiver) = channel();
    // miss, then hit, then refresh
    for round in 0..3 {
        let sender = sender.clone();
        let callback = Box::new(move |result: cachecall::Result<Response<String>>| {
            sender.send((thread::current().id(), result.is_ok())).unwrap();
        });
        let fresh = call.clone();
        if round == 2 {
            fresh.refresh(callback).unwrap();
        } else {
            fresh.enqueue(callback).unwrap();
        }
        let (thread_id, ok) = receiver.recv_timeout(TIMEOUT).unwrap();
        assert!(ok);
        assert_eq!(affinity.thread_id(), thread_id);
    }
}
