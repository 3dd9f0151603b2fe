use quarry_cache::{CacheBuilder, ExponentialBackoff};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use std::time::Duration;

#[derive(Debug)]
struct Beatmap {
  online_id: u64,
  title: String,
}

fn main() {
  let call_counter = Arc::new(AtomicUsize::new(0));

  // A blocking cache over a simulated flaky remote catalogue: the first
  // attempt fails, the retry succeeds.
  let cache = CacheBuilder::default()
    .batch_window(Duration::from_millis(10))
    .backoff(ExponentialBackoff::new(Duration::from_millis(50)))
    .executor({
      let counter = call_counter.clone();
      move |ids: &[u64]| {
        let attempt = counter.fetch_add(1, Ordering::SeqCst);
        if attempt == 0 {
          println!("--- Remote: attempt {} fails (simulated outage)", attempt);
          return Err("catalogue unavailable".into());
        }
        println!("--- Remote: attempt {} resolves {:?}", attempt, ids);
        Ok(
          ids
            .iter()
            .map(|&online_id| Beatmap {
              online_id,
              title: format!("track-{}", online_id),
            })
            .collect(),
        )
      }
    })
    .key_of(|beatmap: &Beatmap| beatmap.online_id)
    .build()
    .expect("Failed to build cache");

  println!("Requesting three beatmaps in one call...\n");
  let maps = cache.get_many([11, 12, 13]);
  for map in maps.iter().flatten() {
    println!("Resolved {}: {}", map.online_id, map.title);
  }

  println!("\nRepeat lookup (memory only):");
  let map = cache.get(&12).expect("cached");
  println!("Resolved {}: {}", map.online_id, map.title);

  println!(
    "\nRemote was called {} time(s) in total (1 failure + 1 success).",
    call_counter.load(Ordering::SeqCst)
  );
  println!("\nCache metrics: {:#?}", cache.metrics());
}
