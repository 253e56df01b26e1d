//! Pong Pinball headless demo
//!
//! Plays a host and a client against each other over the in-process loopback
//! channel, both paddles steered by the computer, and logs how it went.
//!
//! Usage: `pong-pinball [settings.json] [seconds]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use pong_pinball::ai::Opponent;
    use pong_pinball::net::{LoopbackChannel, ManualClock};
    use pong_pinball::sim::{Half, Side};
    use pong_pinball::{Match, MatchStatus, Settings};

    const FRAME_MS: u64 = 16;
    let frame_dt = FRAME_MS as f32 / 1000.0;

    env_logger::init();

    let mut args = std::env::args().skip(1);
    let settings = Settings::load(args.next().unwrap_or_else(|| "pong-pinball.json".into()));
    let seconds: u64 = match args.next().map(|s| s.parse()) {
        None => 30,
        Some(Ok(n)) => n,
        Some(Err(e)) => {
            log::error!("Bad duration: {e}");
            std::process::exit(2);
        }
    };

    let clock = ManualClock::new(1_000);
    let (a, b) = LoopbackChannel::pair_with(settings.net.loopback, settings.seed);
    let mut host = Match::host(a, &settings, Box::new(clock.clone()));
    let mut client = Match::client(b, &settings, Box::new(clock.clone()));
    let mut left = Opponent::new(Side::Left, settings.ai.twitchy);
    let mut right = Opponent::new(Side::Right, settings.ai.twitchy);

    log::info!("Running {seconds}s over loopback ({:?})", settings.net.loopback);

    let frames = seconds * 1000 / FRAME_MS;
    let mut worst_drift = 0.0f32;
    let mut status = MatchStatus::Playing;
    for _ in 0..frames {
        clock.advance(FRAME_MS);

        let mv = left.think(host.state(), frame_dt);
        host.set_paddle_input(Side::Left, mv.target);
        for half in Half::ORDER {
            host.set_flipper(Side::Left, half, mv.flips[half.index()]);
        }
        status = host.frame(frame_dt);

        let mv = right.think(client.state(), frame_dt);
        client.set_paddle_input(Side::Right, mv.target);
        for half in Half::ORDER {
            client.set_flipper(Side::Right, half, mv.flips[half.index()]);
        }
        client.frame(frame_dt);

        for event in host.drain_events() {
            log::debug!("{event:?}");
        }
        if host.view().phase() == client.view().phase() {
            let drift = host.view().ball_position() - client.view().ball_position();
            worst_drift = worst_drift.max(drift.length());
        }

        if status != MatchStatus::Playing {
            break;
        }
    }

    match status {
        MatchStatus::Finished { winner } => log::info!("{winner:?} won"),
        MatchStatus::Disconnected => log::warn!("Peer disconnected"),
        MatchStatus::Playing => log::info!("Time up"),
    }
    log::info!("Final score {}", host.view().score().display());
    log::info!("Worst ball drift on the client: {worst_drift:.1}");
    if let (Some(h), Some(c)) = (host.stats(), client.stats()) {
        log::info!("Host frames {h:?}");
        log::info!("Client frames {c:?}");
    }

    host.disconnect();
    client.disconnect();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Library only on the web; the page drives `Match` directly
}
