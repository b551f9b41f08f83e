use std::time::Duration;

use dogstatsy::{DogStatsyBuilder, Tag};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

fn main() {
    tracing_subscriber::fmt::init();

    let client = DogStatsyBuilder::default()
        .with_remote_address("localhost:9125")
        .expect("failed to parse remote address")
        .with_service("dogstatsy-demo")
        .with_environment("development")
        .with_sample_rate(0.75)
        .on_error(|e| eprintln!("dropped metric: {e}"))
        .build()
        .expect("failed to build DogStatsD client");

    client.incr("idle_metric", &[]);
    client.gauge("testing", 42.0, &[]);

    let mut rng = Xoshiro256StarStar::from_rng(&mut rand::rng());
    let system = [Tag::from_static_parts("system", "foo")];

    // Loop over and over, pretending to do some work.
    loop {
        let timer = client.start_histogram("server_loop_delta_ms");

        client.incr("server_loops", &system);
        std::thread::sleep(Duration::from_millis(rng.random_range(0..50)));

        if rand::random_bool(0.75) {
            client.incr("lucky_iterations", &[]);
        } else {
            client.decr("lucky_iterations", &[]);
        }

        timer.stop(&system);
    }
}
