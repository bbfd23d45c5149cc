//! Playback engine - core orchestration
//!
//! Owns the playlist, the play-mode selector and the progress reporter, and
//! drives an [`AudioBackend`] through the playback lifecycle:
//!
//! ```text
//! Idle -> Preparing -> Playing <-> Paused
//!             |           |          |
//!             v           v          v
//!           Error      Stopped    Stopped
//! ```
//!
//! The engine is single-owner: every mutation goes through `&mut self`.
//! Backend and focus reports arrive on an inbox and take effect when the
//! owner calls [`PlaybackEngine::process_pending`] (or when the engine runs
//! on an [`crate::EngineThread`]).

use crossbeam_channel::{bounded, Receiver, Sender};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::{
    backend::{AudioBackend, BackendEvent, EngineCallbacks, Generation},
    command::{Command, EngineMessage, Flow, Query},
    error::{BackendFault, PlaybackError, Result},
    focus::AudioFocus,
    observable::{EngineSignal, EngineStreams, EventStream, Observable},
    play_mode::PlayModeSelector,
    playlist::PlaylistStore,
    progress::ProgressReporter,
    session::{SessionHandle, SessionToken},
    types::{PlayMode, PlayState, PlaybackConfig, Track},
};

/// Returned by [`PlaybackEngine::audio_session_id`] while nothing is loaded
pub const NO_AUDIO_SESSION: i32 = -1;

/// Publisher side of every engine stream
struct Publishers {
    playlist: Observable<Vec<Track>>,
    current_track: Observable<Option<Track>>,
    play_state: Observable<PlayState>,
    play_progress: Observable<u64>,
    buffering_percent: Observable<u8>,
    play_mode: Observable<PlayMode>,
    signals: EventStream<EngineSignal>,
}

impl Publishers {
    fn new(mode: PlayMode) -> Self {
        Self {
            playlist: Observable::new(Vec::new()),
            current_track: Observable::new(None),
            play_state: Observable::new(PlayState::Idle),
            play_progress: Observable::new(0),
            buffering_percent: Observable::new(0),
            play_mode: Observable::new(mode),
            signals: EventStream::new(),
        }
    }

    fn readers(&self) -> EngineStreams {
        EngineStreams {
            playlist: self.playlist.reader(),
            current_track: self.current_track.reader(),
            play_state: self.play_state.reader(),
            play_progress: self.play_progress.reader(),
            buffering_percent: self.buffering_percent.reader(),
            play_mode: self.play_mode.reader(),
            signals: self.signals.clone(),
        }
    }
}

/// Playback engine
///
/// Commands return synchronously; state changes are observed through
/// [`PlaybackEngine::streams`].
pub struct PlaybackEngine {
    backend: Box<dyn AudioBackend>,
    focus: Box<dyn AudioFocus>,

    // Playlist and mode
    playlist: PlaylistStore,
    selector: PlayModeSelector,
    mode: PlayMode,

    // Lifecycle
    state: PlayState,
    generation: Generation,
    start_on_prepared: bool,
    pending_seek: Option<u64>,
    has_focus: bool,

    // Consecutive skippable failures without a successful start
    failure_streak: usize,

    progress: ProgressReporter,
    volume: (f32, f32),
    session: SessionHandle,
    publishers: Publishers,

    // Inbox shared by backend, focus provider and host commands
    inbox_tx: Sender<EngineMessage>,
    inbox_rx: Receiver<EngineMessage>,

    // Reports raised by the engine itself (synchronous prepare failures)
    deferred: VecDeque<EngineMessage>,
}

impl PlaybackEngine {
    /// Create an engine around a backend and a focus provider
    pub fn new(
        config: PlaybackConfig,
        mut backend: Box<dyn AudioBackend>,
        focus: Box<dyn AudioFocus>,
    ) -> Self {
        let (inbox_tx, inbox_rx) = bounded(config.queue_capacity.max(1));
        backend.attach(EngineCallbacks::new(inbox_tx.clone()));

        let volume = (
            clamp_volume(config.volume.0),
            clamp_volume(config.volume.1),
        );
        backend.set_volume(volume.0, volume.1);

        let session = SessionHandle::new();
        info!(
            "Playback engine created (session {}, mode {:?}, progress every {:?})",
            session.token(),
            config.play_mode,
            config.effective_progress_interval()
        );

        Self {
            backend,
            focus,
            playlist: PlaylistStore::new(),
            selector: PlayModeSelector::new(),
            mode: config.play_mode,
            state: PlayState::Idle,
            generation: Generation::default(),
            start_on_prepared: false,
            pending_seek: None,
            has_focus: false,
            failure_streak: 0,
            progress: ProgressReporter::new(config.effective_progress_interval()),
            volume,
            session,
            publishers: Publishers::new(config.play_mode),
            inbox_tx,
            inbox_rx,
            deferred: VecDeque::new(),
        }
    }

    // ===== Playlist Commands =====

    /// Append `track` (or focus its existing entry) and start it
    pub fn add_and_play(&mut self, track: Track) {
        let len_before = self.playlist.len();
        let index = self.playlist.add_and_focus(track);
        if self.playlist.len() > len_before {
            self.selector.on_appended(index);
            self.publish_playlist();
        }
        self.user_start(index);
    }

    /// Replace the playlist and start `track`
    ///
    /// An empty `tracks` is rejected and nothing changes.
    pub fn replace_all(&mut self, tracks: Vec<Track>, track: Track) -> Result<()> {
        let index = self.playlist.replace_all(tracks, track)?;
        self.selector.reset(self.playlist.len());
        self.publish_playlist();
        self.user_start(index);
        Ok(())
    }

    /// Start `track`, or the current entry when `None`
    ///
    /// A track not yet in the playlist is appended first.
    pub fn play(&mut self, track: Option<Track>) -> Result<()> {
        let index = match track {
            Some(track) => match self.playlist.position_of(&track.id) {
                Some(index) => index,
                None => {
                    let index = self.playlist.add_and_focus(track);
                    self.selector.on_appended(index);
                    self.publish_playlist();
                    index
                }
            },
            None => match self.playlist.current_index() {
                Some(index) => index,
                None => {
                    debug!("play: playlist is empty");
                    self.publishers.signals.emit(EngineSignal::NoCurrentTrack);
                    return Err(PlaybackError::NoCurrentTrack);
                }
            },
        };
        self.user_start(index);
        Ok(())
    }

    /// Remove `track` from the playlist
    ///
    /// Deleting the current track moves to the track `next()` would pick,
    /// else the one `prev()` would pick. Playback follows only if it was
    /// active; a paused engine stops.
    pub fn delete(&mut self, track: &Track) -> Result<()> {
        let Some(index) = self.playlist.position_of(&track.id) else {
            return Err(PlaybackError::TrackNotFound(track.id.clone()));
        };

        if self.playlist.current_index() != Some(index) {
            self.playlist.remove(&track.id);
            self.selector.on_removed(index);
            self.publish_playlist();
            debug!("Deleted track {} at {}", track.id, index);
            return Ok(());
        }

        if self.playlist.len() == 1 {
            self.playlist.remove(&track.id);
            self.selector.reset(0);
            self.halt();
            self.publish_playlist();
            self.publish_current_track();
            info!("Deleted last track {}", track.id);
            return Ok(());
        }

        let successor = self.successor_of(index);
        self.playlist.remove(&track.id);
        self.selector.on_removed(index);
        let new_index = if successor > index {
            successor - 1
        } else {
            successor
        };
        self.playlist.focus(new_index)?;
        self.publish_playlist();
        info!(
            "Deleted current track {}, moving to position {}",
            track.id, new_index
        );

        if self.state.is_active() {
            self.start_index(new_index);
        } else {
            if self.state == PlayState::Paused {
                self.halt();
            }
            self.publish_current_track();
        }
        Ok(())
    }

    /// Remove every track and stop
    pub fn clear_playlist(&mut self) {
        self.playlist.clear();
        self.selector.reset(0);
        self.halt();
        self.publish_playlist();
        self.publish_current_track();
        info!("Playlist cleared");
    }

    // ===== Playback Control =====

    /// Toggle between playing and paused
    ///
    /// From Idle, Stopped or Error this starts the current entry.
    pub fn play_pause(&mut self) -> Result<()> {
        match self.state {
            PlayState::Playing => {
                self.pause_player(false);
                Ok(())
            }
            PlayState::Paused => self.resume(),
            PlayState::Preparing => {
                self.start_on_prepared = !self.start_on_prepared;
                debug!(
                    "play_pause while preparing: start_on_prepared={}",
                    self.start_on_prepared
                );
                Ok(())
            }
            PlayState::Idle | PlayState::Stopped | PlayState::Error => self.play(None),
        }
    }

    /// Resume or start output
    pub fn start_player(&mut self) -> Result<()> {
        match self.state {
            PlayState::Paused => self.resume(),
            PlayState::Preparing => {
                self.start_on_prepared = true;
                Ok(())
            }
            PlayState::Playing => Ok(()),
            PlayState::Idle | PlayState::Stopped | PlayState::Error => self.play(None),
        }
    }

    /// Pause output; optionally give up audio focus as well
    pub fn pause_player(&mut self, abandon_focus: bool) {
        match self.state {
            PlayState::Playing => {
                self.backend.pause();
                self.transition(PlayState::Paused);
            }
            PlayState::Preparing => {
                // Prepared track will land in Paused
                self.start_on_prepared = false;
            }
            _ => {}
        }
        if abandon_focus {
            self.release_focus();
        }
    }

    /// Stop output and release focus; the current track stays selected
    pub fn stop_player(&mut self) {
        self.halt();
    }

    /// Advance according to the play mode
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<()> {
        let len = self.playlist.len();
        if len == 0 {
            self.publishers.signals.emit(EngineSignal::NoCurrentTrack);
            return Ok(());
        }
        match self
            .selector
            .select_next(len, self.playlist.current_index(), self.mode)
        {
            Some(index) => self.user_start(index),
            None => debug!("next: end of playlist in {:?}", self.mode),
        }
        Ok(())
    }

    /// Step back according to the play mode
    pub fn prev(&mut self) -> Result<()> {
        let len = self.playlist.len();
        if len == 0 {
            self.publishers.signals.emit(EngineSignal::NoCurrentTrack);
            return Ok(());
        }
        match self
            .selector
            .select_prev(len, self.playlist.current_index(), self.mode)
        {
            Some(index) => self.user_start(index),
            None => debug!("prev: start of playlist in {:?}", self.mode),
        }
        Ok(())
    }

    /// Seek within the current track
    ///
    /// Clamped to `[0, duration]`. Queued until prepared when called during
    /// preparation. Progress jumps to the clamped value immediately.
    /// Ignored unless a track is loaded (Preparing, Playing or Paused).
    pub fn seek_to(&mut self, msec: i64) {
        if !matches!(
            self.state,
            PlayState::Preparing | PlayState::Playing | PlayState::Paused
        ) {
            debug!("seek_to ignored in {:?}: nothing loaded", self.state);
            return;
        }
        let Some(track) = self.playlist.current() else {
            return;
        };

        let upper = track.duration_ms().or_else(|| self.backend.duration_ms());
        let mut position = msec.max(0) as u64;
        if let Some(upper) = upper {
            position = position.min(upper);
        }

        match self.state {
            PlayState::Playing | PlayState::Paused => self.backend.seek_to(position),
            PlayState::Preparing => self.pending_seek = Some(position),
            PlayState::Idle | PlayState::Stopped | PlayState::Error => return,
        }
        debug!("Seek to {}ms (requested {}ms)", position, msec);
        self.reset_progress(position);
    }

    /// Per-channel volume, clamped to 0.0-1.0
    pub fn set_volume(&mut self, left: f32, right: f32) {
        self.volume = (clamp_volume(left), clamp_volume(right));
        self.backend.set_volume(self.volume.0, self.volume.1);
    }

    pub fn volume(&self) -> (f32, f32) {
        self.volume
    }

    pub fn set_play_mode(&mut self, mode: PlayMode) {
        if mode == self.mode {
            return;
        }
        if mode == PlayMode::Shuffle {
            self.selector.reset(self.playlist.len());
        }
        info!("Play mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        self.publishers.play_mode.set(mode);
    }

    // ===== Queries =====

    /// Backend position, 0 when nothing is loaded
    pub fn audio_position(&self) -> u64 {
        match self.state {
            PlayState::Idle | PlayState::Stopped => 0,
            _ => self.backend.position_ms(),
        }
    }

    /// Backend audio session id, or [`NO_AUDIO_SESSION`] before the first track
    pub fn audio_session_id(&self) -> i32 {
        match self.state {
            PlayState::Idle => NO_AUDIO_SESSION,
            _ => self.backend.audio_session_id(),
        }
    }

    pub fn session_token(&self) -> SessionToken {
        self.session.token()
    }

    pub fn session(&self) -> SessionHandle {
        self.session.clone()
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn play_mode(&self) -> PlayMode {
        self.mode
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.playlist.current()
    }

    pub fn playlist(&self) -> &[Track] {
        self.playlist.tracks()
    }

    /// Read-only handles to every stream
    pub fn streams(&self) -> EngineStreams {
        self.publishers.readers()
    }

    /// Handle for platform collaborators to report into this engine
    pub fn callbacks(&self) -> EngineCallbacks {
        EngineCallbacks::new(self.inbox_tx.clone())
    }

    // ===== Event Processing =====

    /// Apply every queued report and command
    ///
    /// Returns how many messages were handled. A queued shutdown request is
    /// dropped here; only [`crate::EngineThread`] acts on it.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let message = match self.deferred.pop_front() {
                Some(message) => message,
                None => match self.inbox_rx.try_recv() {
                    Ok(message) => message,
                    Err(_) => break,
                },
            };
            self.handle_message(message);
            handled += 1;
        }
        handled
    }

    /// Sample progress if due
    pub fn on_tick(&mut self, now: Instant) {
        if self.state != PlayState::Playing || !self.progress.poll(now) {
            return;
        }
        let sample = self.backend.position_ms();
        if let Some(position) = self.progress.accept(sample) {
            self.publishers.play_progress.set(position);
        }
    }

    /// Time until the next progress sample, `None` while not playing
    pub fn next_tick_in(&self, now: Instant) -> Option<Duration> {
        self.progress.time_until_due(now)
    }

    /// Stop everything and invalidate the session
    ///
    /// Safe to call more than once.
    pub fn teardown(&mut self) {
        if !self.session.is_active() {
            return;
        }
        self.halt();
        self.session.invalidate();
        info!("Playback engine torn down (session {})", self.session.token());
    }

    /// Execute one host command
    pub fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::AddAndPlay(track) => {
                self.add_and_play(track);
                Ok(())
            }
            Command::ReplaceAll { tracks, track } => self.replace_all(tracks, track),
            Command::Play(track) => self.play(track),
            Command::Delete(track) => self.delete(&track),
            Command::ClearPlaylist => {
                self.clear_playlist();
                Ok(())
            }
            Command::PlayPause => self.play_pause(),
            Command::StartPlayer => self.start_player(),
            Command::PausePlayer { abandon_focus } => {
                self.pause_player(abandon_focus);
                Ok(())
            }
            Command::StopPlayer => {
                self.stop_player();
                Ok(())
            }
            Command::Next => self.next(),
            Command::Prev => self.prev(),
            Command::SeekTo(msec) => {
                self.seek_to(msec);
                Ok(())
            }
            Command::SetVolume { left, right } => {
                self.set_volume(left, right);
                Ok(())
            }
            Command::SetPlayMode(mode) => {
                self.set_play_mode(mode);
                Ok(())
            }
        }
    }

    pub(crate) fn inbox(&self) -> Receiver<EngineMessage> {
        self.inbox_rx.clone()
    }

    pub(crate) fn inbox_sender(&self) -> Sender<EngineMessage> {
        self.inbox_tx.clone()
    }

    /// Apply reports the engine raised itself
    pub(crate) fn process_deferred(&mut self) {
        while let Some(message) = self.deferred.pop_front() {
            self.handle_message(message);
        }
    }

    pub(crate) fn handle_message(&mut self, message: EngineMessage) -> Flow {
        match message {
            EngineMessage::Backend { generation, event } => {
                self.on_backend_event(generation, event);
            }
            EngineMessage::FocusLost => {
                info!("Audio focus lost");
                self.has_focus = false;
                self.pause_player(true);
            }
            EngineMessage::Command { command, reply } => {
                let result = self.execute(command);
                if let Some(reply) = reply {
                    // Caller may have given up waiting
                    let _ = reply.send(result);
                }
            }
            EngineMessage::Query(query) => match query {
                Query::AudioPosition(reply) => {
                    let _ = reply.send(self.audio_position());
                }
                Query::AudioSessionId(reply) => {
                    let _ = reply.send(self.audio_session_id());
                }
            },
            EngineMessage::Shutdown => return Flow::Shutdown,
        }
        Flow::Continue
    }

    fn on_backend_event(&mut self, generation: Generation, event: BackendEvent) {
        if generation != self.generation {
            debug!(
                "Discarding stale {:?} (generation {}, current {})",
                event,
                generation.value(),
                self.generation.value()
            );
            return;
        }

        match event {
            BackendEvent::Prepared => self.on_prepared(),
            BackendEvent::Completed => self.on_completed(),
            BackendEvent::Error(fault) => self.on_error(fault),
            BackendEvent::Buffering(percent) => {
                self.publishers
                    .buffering_percent
                    .set_if_changed(percent.min(100));
            }
        }
    }

    fn on_prepared(&mut self) {
        if self.state != PlayState::Preparing {
            debug!("Prepared in {:?}, ignoring", self.state);
            return;
        }
        self.failure_streak = 0;

        if let Some(position) = self.pending_seek.take() {
            self.backend.seek_to(position);
        }

        if !self.start_on_prepared {
            self.transition(PlayState::Paused);
            return;
        }
        if !self.acquire_focus() {
            self.transition(PlayState::Paused);
            return;
        }
        self.backend.start();
        self.transition(PlayState::Playing);
    }

    fn on_completed(&mut self) {
        if self.state != PlayState::Playing {
            debug!("Completion in {:?}, ignoring", self.state);
            return;
        }

        let next = self.selector.select_next(
            self.playlist.len(),
            self.playlist.current_index(),
            self.mode,
        );
        match next {
            Some(index) => self.start_index(index),
            None => {
                info!("Reached end of playlist");
                self.halt();
            }
        }
    }

    fn on_error(&mut self, fault: BackendFault) {
        let track_id = self
            .playlist
            .current()
            .map(|t| t.id.clone())
            .unwrap_or_default();
        warn!("Playback failed for track {}: {}", track_id, fault);

        // Later reports for this preparation are stale
        self.generation = self.generation.next();
        self.backend.stop();
        self.pending_seek = None;
        self.transition(PlayState::Error);
        self.publishers.signals.emit(EngineSignal::PlaybackFailed {
            track_id,
            fault: fault.clone(),
        });

        if !fault.is_skippable() {
            return;
        }

        let len = self.playlist.len();
        self.failure_streak += 1;
        if self.failure_streak >= len {
            let attempts = self.failure_streak;
            warn!("No track in the playlist could be played ({} attempts)", attempts);
            self.failure_streak = 0;
            self.halt();
            self.publishers
                .signals
                .emit(EngineSignal::AllTracksFailed { attempts });
            return;
        }

        // LoopOne moves past the broken track too
        let mode = match self.mode {
            PlayMode::LoopOne => PlayMode::LoopAll,
            mode => mode,
        };
        match self
            .selector
            .select_next(len, self.playlist.current_index(), mode)
        {
            Some(index) => self.start_index(index),
            None => debug!("No track left after failure in {:?}", mode),
        }
    }

    // ===== Internals =====

    /// Start a track the user asked for
    fn user_start(&mut self, index: usize) {
        self.failure_streak = 0;
        self.start_index(index);
    }

    fn start_index(&mut self, index: usize) {
        if let Err(e) = self.playlist.focus(index) {
            warn!("Cannot focus position {}: {}", index, e);
            return;
        }
        self.selector.note_played(self.playlist.len(), index);
        self.publish_current_track();
        self.prepare_current();
    }

    /// Retarget the backend at the current track
    fn prepare_current(&mut self) {
        let Some(track) = self.playlist.current().cloned() else {
            return;
        };

        self.cancel_in_flight();
        self.start_on_prepared = true;
        self.pending_seek = None;
        self.reset_progress(0);
        self.publishers
            .buffering_percent
            .set_if_changed(if track.is_streamed() { 0 } else { 100 });
        self.transition(PlayState::Preparing);

        info!(
            "Preparing {} - {} (generation {})",
            track.title,
            track.subtitle(),
            self.generation.value()
        );
        if let Err(fault) = self.backend.prepare(self.generation, &track) {
            self.deferred.push_back(EngineMessage::Backend {
                generation: self.generation,
                event: BackendEvent::Error(fault),
            });
        }
    }

    /// Invalidate the in-flight preparation and release the backend
    fn cancel_in_flight(&mut self) {
        self.generation = self.generation.next();
        if !matches!(self.state, PlayState::Idle | PlayState::Stopped) {
            self.backend.stop();
        }
    }

    /// Stop playback, release focus and reset progress
    fn halt(&mut self) {
        self.cancel_in_flight();
        self.pending_seek = None;
        self.release_focus();
        self.reset_progress(0);
        if self.state != PlayState::Stopped {
            self.transition(PlayState::Stopped);
        }
    }

    fn resume(&mut self) -> Result<()> {
        if !self.acquire_focus() {
            return Err(PlaybackError::FocusDenied);
        }
        self.backend.start();
        self.transition(PlayState::Playing);
        Ok(())
    }

    /// Acquire focus if not held; emits `FocusDenied` on refusal
    fn acquire_focus(&mut self) -> bool {
        if !self.has_focus {
            self.has_focus = self.focus.request();
            if !self.has_focus {
                warn!("Audio focus denied");
                self.publishers.signals.emit(EngineSignal::FocusDenied);
            }
        }
        self.has_focus
    }

    fn release_focus(&mut self) {
        if self.has_focus {
            self.focus.abandon();
            self.has_focus = false;
        }
    }

    /// Index that takes over when the current track at `index` is deleted
    fn successor_of(&mut self, index: usize) -> usize {
        let len = self.playlist.len();
        let mode = self.mode;
        self.selector
            .select_next(len, Some(index), mode)
            .filter(|&i| i != index && i < len)
            .or_else(|| {
                self.selector
                    .select_prev(len, Some(index), mode)
                    .filter(|&i| i != index && i < len)
            })
            .unwrap_or(if index + 1 < len { index + 1 } else { index - 1 })
    }

    /// Publish the new state; progress sampling runs only while playing
    fn transition(&mut self, next: PlayState) {
        if self.state == next {
            debug!("State {:?} re-entered", next);
        } else {
            info!("State {:?} -> {:?}", self.state, next);
        }
        self.state = next;

        if next == PlayState::Playing {
            self.progress.start(Instant::now());
        } else {
            self.progress.stop();
        }
        self.publishers.play_state.set(next);
    }

    fn reset_progress(&mut self, position: u64) {
        self.progress.rebase(position);
        self.publishers.play_progress.set(position);
    }

    fn publish_playlist(&self) {
        self.publishers.playlist.set(self.playlist.snapshot());
    }

    fn publish_current_track(&self) {
        self.publishers
            .current_track
            .set_if_changed(self.playlist.current().cloned());
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn clamp_volume(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
