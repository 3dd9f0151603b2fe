use quarry_cache::{CacheBuilder, FetchError};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use tokio::time::{sleep, Duration};

#[derive(Debug)]
struct User {
  id: u64,
  name: String,
}

// A simulated remote directory service answering one batched request.
async fn fetch_users(ids: Vec<u64>, call_count: Arc<AtomicUsize>) -> Result<Vec<User>, FetchError> {
  call_count.fetch_add(1, Ordering::SeqCst);
  println!("--- Remote: one round-trip for {} user id(s): {:?}", ids.len(), ids);
  sleep(Duration::from_millis(200)).await;
  // Id 404 does not exist upstream.
  Ok(
    ids
      .into_iter()
      .filter(|&id| id != 404)
      .map(|id| User {
        id,
        name: format!("user-{}", id),
      })
      .collect(),
  )
}

#[tokio::main]
async fn main() {
  let call_counter = Arc::new(AtomicUsize::new(0));

  let cache = Arc::new(
    CacheBuilder::default()
      .batch_window(Duration::from_millis(25))
      .async_executor({
        let counter = call_counter.clone();
        move |ids: Vec<u64>| fetch_users(ids, counter.clone())
      })
      .key_of(|user: &User| user.id)
      .build_async()
      .expect("Failed to build async cache"),
  );

  println!("--- Coalescing Demonstration ---");
  println!("Spawning 10 tasks requesting overlapping user ids at once.\n");

  let mut tasks = Vec::new();
  for i in 0..10u64 {
    let cache_clone = cache.clone();
    tasks.push(tokio::spawn(async move {
      // Ten tasks, but only three distinct ids (plus one missing).
      let id = [1, 2, 3, 404][(i % 4) as usize];
      match cache_clone.get(&id).await {
        Some(user) => println!("[Task {}] id {} resolved to {}", i, id, user.name),
        None => println!("[Task {}] id {} is absent upstream", i, id),
      }
    }));
  }
  for task in tasks {
    task.await.unwrap();
  }

  println!("\n--- Verification ---");
  println!(
    "Remote was called {} time(s) for 10 concurrent lookups.",
    call_counter.load(Ordering::SeqCst)
  );

  println!("\n--- Bulk Lookup ---");
  let users = cache.get_many([1, 2, 3, 4, 5]).await;
  println!(
    "Bulk lookup resolved {}/5 ids; only the uncached ones hit the network.",
    users.iter().flatten().count()
  );

  println!("\nCache metrics: {:#?}", cache.metrics());
}
