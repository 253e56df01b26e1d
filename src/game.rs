//! Frame driver
//!
//! Runs the fixed timestep simulation from variable frame times and does one
//! network exchange per rendered frame:
//!
//! 1. pump the session and apply every accepted payload as truth, in order
//! 2. step the simulation in `SIM_DT` substeps
//! 3. extrapolate remote values if nothing fresh arrived
//! 4. send this peer's update

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;

use crate::ai::Opponent;
use crate::consts::*;
use crate::net::{
    Clock, ClientUpdate, DataChannel, HostUpdate, LoopbackChannel, NetVector, Role, Session,
    SessionStats, SystemClock,
};
use crate::settings::Settings;
use crate::sim::{
    BumperMood, GameEvent, GamePhase, GameState, Half, PADDLE_TRAVEL, Score, Side, TickInput,
    extrapolate, tick,
};

/// Longest frame the driver will try to catch up on
const MAX_FRAME_DT: f32 = 0.1;

/// Where the match stands after a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Playing,
    Finished { winner: Side },
    /// The peer channel closed. Terminal.
    Disconnected,
}

type Inbox<T> = Rc<RefCell<Vec<T>>>;

enum Link<C> {
    /// Both paddles on this machine, optionally one of them the computer
    Local { opponent: Option<Opponent> },
    Host {
        session: Session<C, ClientUpdate>,
        inbox: Inbox<ClientUpdate>,
    },
    Client {
        session: Session<C, HostUpdate>,
        inbox: Inbox<HostUpdate>,
    },
}

/// Accepted payloads in arrival order, drained once per frame
fn inbox<C: DataChannel, In: serde::de::DeserializeOwned + 'static>(
    session: &mut Session<C, In>,
) -> Inbox<In> {
    let inbox: Inbox<In> = Rc::default();
    let sink = inbox.clone();
    session.on_receive(move |payload| sink.borrow_mut().push(payload));
    inbox
}

fn resolve_seed(seed: u64, clock: &dyn Clock) -> u64 {
    if seed != 0 {
        seed
    } else {
        clock.now_ms().max(1)
    }
}

/// One match, local or over a peer channel
pub struct Match<C = LoopbackChannel> {
    state: GameState,
    role: Role,
    link: Link<C>,
    input: TickInput,
    accumulator: f32,
    moods: Vec<BumperMood>,
    events: Vec<GameEvent>,
    disconnected: bool,
}

impl Match<LoopbackChannel> {
    /// Hot-seat match, or against the computer on the right
    pub fn local(settings: &Settings, vs_computer: bool) -> Self {
        let seed = resolve_seed(settings.seed, &SystemClock);
        let opponent = vs_computer.then(|| Opponent::new(Side::Right, settings.ai.twitchy));
        log::info!("Local match (seed {seed}, computer: {vs_computer})");
        Self::with_link(
            GameState::new(seed, settings.rules),
            Role::Authority,
            Link::Local { opponent },
        )
    }
}

impl<C: DataChannel> Match<C> {
    /// Authority end of a netplay match, over an already-open channel
    pub fn host(channel: C, settings: &Settings, clock: Box<dyn Clock>) -> Self {
        let seed = resolve_seed(settings.seed, clock.as_ref());
        let mut session = Session::with_clock(channel, Role::Authority, clock);
        let inbox = inbox(&mut session);
        Self::with_link(
            GameState::new(seed, settings.rules),
            Role::Authority,
            Link::Host { session, inbox },
        )
    }

    /// Dependent end of a netplay match
    pub fn client(channel: C, settings: &Settings, clock: Box<dyn Clock>) -> Self {
        let mut session = Session::with_clock(channel, Role::Dependent, clock);
        let inbox = inbox(&mut session);
        // Never launches anything itself, the seed is irrelevant
        let mut state = GameState::new(1, settings.rules);
        state.pending.clear();
        Self::with_link(state, Role::Dependent, Link::Client { session, inbox })
    }

    fn with_link(state: GameState, role: Role, link: Link<C>) -> Self {
        let moods = state.bumper_moods(role.local_side());
        Self {
            state,
            role,
            link,
            input: TickInput::default(),
            accumulator: 0.0,
            moods,
            events: Vec::new(),
            disconnected: false,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Session counters, `None` for local matches
    pub fn stats(&self) -> Option<SessionStats> {
        match &self.link {
            Link::Local { .. } => None,
            Link::Host { session, .. } => Some(session.stats()),
            Link::Client { session, .. } => Some(session.stats()),
        }
    }

    /// Whether input for `side` comes from this machine's player
    pub fn controls(&self, side: Side) -> bool {
        match &self.link {
            Link::Local { opponent } => opponent.as_ref().is_none_or(|ai| ai.side != side),
            Link::Host { .. } | Link::Client { .. } => side == self.role.local_side(),
        }
    }

    /// Pointer/drag target for a paddle pivot
    pub fn set_paddle_input(&mut self, side: Side, y: f32) {
        if !self.controls(side) {
            log::debug!("Ignoring paddle input for {side:?}");
            return;
        }
        self.input.paddle_targets[side.index()] = Some(y);
    }

    /// Hold or release one paddle half
    pub fn set_flipper(&mut self, side: Side, half: Half, active: bool) {
        if !self.controls(side) {
            log::debug!("Ignoring flipper input for {side:?}");
            return;
        }
        self.state.paddle_mut(side).flips[half.index()] = active;
    }

    /// Restart with a clean score. Only the authority can do this; the
    /// client follows through the next host update.
    pub fn new_match(&mut self) {
        if self.role == Role::Dependent {
            log::debug!("Client cannot restart the match");
            return;
        }
        self.state.new_match();
        self.accumulator = 0.0;
    }

    /// Close the peer connection, if any
    pub fn disconnect(&mut self) {
        match &mut self.link {
            Link::Local { .. } => {}
            Link::Host { session, .. } => session.disconnect(),
            Link::Client { session, .. } => session.disconnect(),
        }
        self.disconnected = true;
    }

    /// Events since the last call, for audio and effects
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            state: &self.state,
            moods: &self.moods,
            viewer: self.role.local_side(),
        }
    }

    /// Advance by one rendered frame of `dt` seconds
    pub fn frame(&mut self, dt: f32) -> MatchStatus {
        if self.disconnected {
            return MatchStatus::Disconnected;
        }

        let fresh = self.receive();
        if self.disconnected {
            return MatchStatus::Disconnected;
        }

        self.accumulator += dt.clamp(0.0, MAX_FRAME_DT);
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.drive_opponent();
            let report = tick(&mut self.state, &self.input, SIM_DT, self.role);
            self.events.extend(report.events);
            self.moods = report.bumpers;
            self.accumulator -= SIM_DT;
            substeps += 1;
        }

        let networked = !matches!(self.link, Link::Local { .. });
        if networked && !fresh {
            extrapolate(&mut self.state, self.role);
        }

        self.transmit();
        self.status()
    }

    pub fn status(&self) -> MatchStatus {
        if self.disconnected {
            return MatchStatus::Disconnected;
        }
        match self.state.phase {
            GamePhase::GameOver => {
                let score = self.state.score;
                // A client configured with another target still follows the host
                let winner = score
                    .winner(self.state.rules.winning_score)
                    .or_else(|| score.winner(0))
                    .unwrap_or(Side::Left);
                MatchStatus::Finished { winner }
            }
            GamePhase::Respawning | GamePhase::Playing => MatchStatus::Playing,
        }
    }

    fn drive_opponent(&mut self) {
        let Link::Local {
            opponent: Some(ai),
        } = &mut self.link
        else {
            return;
        };
        let mv = ai.think(&self.state, SIM_DT);
        self.input.paddle_targets[ai.side.index()] = Some(mv.target);
        self.state.paddle_mut(ai.side).flips = mv.flips;
    }

    /// Pump the session and apply every accepted payload so each one shifts
    /// `last_truth`. Returns whether any arrived.
    fn receive(&mut self) -> bool {
        let state = &mut self.state;
        let open = match &mut self.link {
            Link::Local { .. } => return false,
            Link::Host { session, inbox } => {
                session.pump();
                let updates = std::mem::take(&mut *inbox.borrow_mut());
                if !updates.is_empty() {
                    for update in &updates {
                        apply_client_update(state, update);
                    }
                    return true;
                }
                session.is_open()
            }
            Link::Client { session, inbox } => {
                session.pump();
                let updates = std::mem::take(&mut *inbox.borrow_mut());
                if !updates.is_empty() {
                    for update in &updates {
                        apply_host_update(state, update);
                    }
                    return true;
                }
                session.is_open()
            }
        };
        if !open {
            log::info!("Peer channel closed");
            self.disconnected = true;
        }
        false
    }

    fn transmit(&mut self) {
        let state = &self.state;
        let result = match &mut self.link {
            Link::Local { .. } => return,
            Link::Host { session, .. } => session.send(&host_update(state)),
            Link::Client { session, .. } => {
                let own = state.paddle(Side::Right);
                session.send(&ClientUpdate {
                    paddle: own.pos.get(),
                    flips: own.flips,
                })
            }
        };
        if let Err(e) = result {
            log::warn!("Match ended: {e}");
            self.disconnected = true;
        }
    }
}

fn host_update(state: &GameState) -> HostUpdate {
    let host = state.paddle(Side::Left);
    let client = state.paddle(Side::Right);
    HostUpdate {
        ball_pos: state.ball.pos.truth().into(),
        ball_vel: state.ball.vel.into(),
        score: state.score,
        host_paddle: host.pos.truth(),
        client_paddle: client.pos.truth(),
        host_flips: host.flips,
        client_flips: client.flips,
        phase: state.phase,
        bumpers: state.bumpers.iter().map(|b| b.lit_by).collect(),
    }
}

fn apply_client_update(state: &mut GameState, update: &ClientUpdate) {
    let paddle = state.paddle_mut(Side::Right);
    paddle
        .pos
        .update_truth(update.paddle.clamp(-PADDLE_TRAVEL, PADDLE_TRAVEL));
    paddle.flips = update.flips;
}

fn apply_host_update(state: &mut GameState, update: &HostUpdate) {
    let pos: Vec2 = update.ball_pos.into();
    if update.phase == GamePhase::Playing {
        state.ball.pos.update_truth(pos);
    } else {
        // Parked ball: no delta worth replaying
        state.ball.pos = NetVector::new(pos);
    }
    state.ball.vel = update.ball_vel.into();
    state.score = update.score;
    state.phase = update.phase;

    let host = state.paddle_mut(Side::Left);
    host.pos.update_truth(update.host_paddle);
    host.flips = update.host_flips;

    for (bumper, lit) in state.bumpers.iter_mut().zip(&update.bumpers) {
        if bumper.lit_by != *lit {
            match lit {
                Some(side) => bumper.light(Some(*side)),
                None => {
                    bumper.lit_by = None;
                    bumper.glow_ticks = 0;
                }
            }
        }
    }
}

/// Read-only snapshot for the presentation layer
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    state: &'a GameState,
    moods: &'a [BumperMood],
    viewer: Side,
}

impl FrameView<'_> {
    pub fn ball_position(&self) -> Vec2 {
        self.state.ball.pos.get()
    }

    pub fn ball_radius(&self) -> f32 {
        self.state.ball.radius
    }

    /// Paddle pivot height
    pub fn paddle_position(&self, side: Side) -> f32 {
        self.state.paddle(side).pos.get()
    }

    /// Flip state as (upper, lower)
    pub fn flips(&self, side: Side) -> [bool; 2] {
        self.state.paddle(side).flips
    }

    pub fn score(&self) -> Score {
        self.state.score
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    /// Bumper colours from this peer's side, in bumper order
    pub fn bumper_moods(&self) -> &[BumperMood] {
        self.moods
    }

    /// Side this machine's player sits on
    pub fn viewer(&self) -> Side {
        self.viewer
    }
}
