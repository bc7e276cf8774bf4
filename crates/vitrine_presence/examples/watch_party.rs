// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Watch Party Example
//!
//! Three viewers join a live stream. One of them keeps the stream open in two tabs, and both tabs
//! run a heartbeat. Time is driven by a controlled clock, so ten minutes pass instantly:
//! - each tab reaches the bonus threshold and claims it
//! - the store grants the bonus once, the second tab is told it was already claimed
//! - leaving twice from the same tab never drives the viewer count below zero

use std::{sync::Arc, time::Duration};

use anyspawn::Spawner;
use tick::ClockControl;
use vitrine_presence::{InMemoryPresenceStore, PresenceTracker, SessionId, StreamId, UserId};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let control = ClockControl::new();
    let clock = control.to_clock();

    let store = Arc::new(InMemoryPresenceStore::new(clock.clone()));
    let stream = StreamId::new("spring-launch");
    store.create_stream(stream.clone());

    let host = UserId::new("host");
    let tab_a = Arc::new(PresenceTracker::new(Arc::clone(&store), clock.clone()));
    let tab_b = Arc::new(PresenceTracker::new(Arc::clone(&store), clock.clone()));
    let guest = PresenceTracker::new(Arc::clone(&store), clock.clone());

    let a = tab_a.join(&stream, Some(host.clone()), Some(SessionId::new("host-tab-a"))).await?;
    let b = tab_b.join(&stream, Some(host.clone()), Some(SessionId::new("host-tab-b"))).await?;
    let anonymous = guest.join(&stream, None, None).await?;
    println!("anonymous viewer joined as {}", anonymous.session_id);
    println!("after joins: {:?}", tab_a.counters(&stream).await?);

    let spawner = Spawner::new_tokio();
    let heartbeat_a = tab_a.spawn_heartbeat(&spawner, stream.clone(), host.clone());
    let heartbeat_b = tab_b.spawn_heartbeat(&spawner, stream.clone(), host.clone());
    settle().await;

    for minute in 1..=10 {
        control.advance(Duration::from_secs(60));
        settle().await;
        println!("minute {minute:>2}: host balance = {}", store.balance(&host));
    }

    println!(
        "heartbeats finished: tab a = {}, tab b = {}",
        heartbeat_a.is_finished(),
        heartbeat_b.is_finished()
    );
    println!("claim state: {:?}", store.claim_state(&host, &stream));

    tab_a.leave(&a.session_id, &stream).await?;
    tab_b.leave(&b.session_id, &stream).await?;
    guest.leave(&anonymous.session_id, &stream).await?;
    guest.leave(&anonymous.session_id, &stream).await?;
    println!("after leaves: {:?}", tab_a.counters(&stream).await?);

    Ok(())
}

async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
