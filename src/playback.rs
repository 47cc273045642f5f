//! Speech playback state per message.
//!
//! Each message moves `Idle -> Loading -> Playing -> Idle`. Loading cannot be
//! cancelled once issued; stopping a playing message takes effect at once.
//! Starting playback for a message that is already playing stops the running
//! instance first, so one message never has two overlapping instances.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use crate::audio::{AudioBuffer, decode_speech};
use crate::backend::ChatBackend;
use crate::observability::{PLAYBACK_STARTS, PLAYBACK_STOPS};
use crate::{Error, MessageId, Result};

/// Where a message's speech is in its lifecycle.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlaybackState {
    /// Nothing requested or playing.
    #[default]
    Idle,
    /// Speech synthesis is in flight.
    Loading,
    /// Audio is playing.
    Playing,
}

/// A device or program that plays decoded audio.
pub trait AudioOutput: Send {
    /// Starts playing `buffer` for message `id`.
    fn start(&mut self, id: MessageId, buffer: &AudioBuffer) -> Result<()>;

    /// Stops playback for `id` immediately; a no-op if nothing is playing.
    fn stop(&mut self, id: MessageId);

    /// Returns true once playback for `id` has ended on its own or was stopped.
    fn is_finished(&mut self, id: MessageId) -> bool;
}

impl<O: AudioOutput + ?Sized> AudioOutput for Box<O> {
    fn start(&mut self, id: MessageId, buffer: &AudioBuffer) -> Result<()> {
        (**self).start(id, buffer)
    }

    fn stop(&mut self, id: MessageId) {
        (**self).stop(id)
    }

    fn is_finished(&mut self, id: MessageId) -> bool {
        (**self).is_finished(id)
    }
}

/// Drives [`PlaybackState`] for every message through one [`AudioOutput`].
pub struct PlaybackController<O: AudioOutput> {
    output: O,
    states: HashMap<MessageId, PlaybackState>,
}

impl<O: AudioOutput> PlaybackController<O> {
    /// Creates a controller with every message idle.
    pub fn new(output: O) -> Self {
        Self {
            output,
            states: HashMap::new(),
        }
    }

    /// The state of message `id`.
    pub fn state(&self, id: MessageId) -> PlaybackState {
        self.states.get(&id).copied().unwrap_or_default()
    }

    /// Messages that are currently loading or playing.
    pub fn active(&self) -> Vec<(MessageId, PlaybackState)> {
        let mut active: Vec<_> = self
            .states
            .iter()
            .filter(|(_, state)| **state != PlaybackState::Idle)
            .map(|(id, state)| (*id, *state))
            .collect();
        active.sort();
        active
    }

    /// The output, for inspection.
    pub fn output(&self) -> &O {
        &self.output
    }

    /// Idle is the default state, so idle messages are not kept.
    fn set(&mut self, id: MessageId, state: PlaybackState) {
        if state == PlaybackState::Idle {
            self.states.remove(&id);
        } else {
            self.states.insert(id, state);
        }
    }

    /// Marks `id` as loading, stopping it first if it is playing.
    pub fn begin_loading(&mut self, id: MessageId) -> Result<()> {
        match self.state(id) {
            PlaybackState::Loading => Err(Error::validation(
                format!("speech for {id} is already loading"),
                Some("id".to_string()),
            )),
            PlaybackState::Playing => {
                self.stop(id);
                self.set(id, PlaybackState::Loading);
                Ok(())
            }
            PlaybackState::Idle => {
                self.set(id, PlaybackState::Loading);
                Ok(())
            }
        }
    }

    /// Returns a loading message to idle after synthesis failed.
    pub fn fail_loading(&mut self, id: MessageId) {
        if self.state(id) == PlaybackState::Loading {
            self.set(id, PlaybackState::Idle);
        }
    }

    /// Decodes `payload` and starts playing it for `id`.
    ///
    /// A decode or output failure leaves the message idle.
    pub fn finish_loading(&mut self, id: MessageId, payload: &str) -> Result<()> {
        let buffer = match decode_speech(payload) {
            Ok(buffer) => buffer,
            Err(err) => {
                self.set(id, PlaybackState::Idle);
                return Err(err);
            }
        };
        self.play(id, &buffer)
    }

    /// Plays an already decoded buffer for `id`.
    pub fn play(&mut self, id: MessageId, buffer: &AudioBuffer) -> Result<()> {
        if self.state(id) == PlaybackState::Playing {
            self.stop(id);
        }
        match self.output.start(id, buffer) {
            Ok(()) => {
                PLAYBACK_STARTS.click();
                self.set(id, PlaybackState::Playing);
                Ok(())
            }
            Err(err) => {
                self.set(id, PlaybackState::Idle);
                Err(err)
            }
        }
    }

    /// Stops `id` immediately. Loading messages are left alone.
    pub fn stop(&mut self, id: MessageId) {
        if self.state(id) == PlaybackState::Playing {
            self.output.stop(id);
            PLAYBACK_STOPS.click();
            self.set(id, PlaybackState::Idle);
        }
    }

    /// Stops every playing message.
    pub fn stop_all(&mut self) {
        let playing: Vec<MessageId> = self
            .states
            .iter()
            .filter(|(_, state)| **state == PlaybackState::Playing)
            .map(|(id, _)| *id)
            .collect();
        for id in playing {
            self.stop(id);
        }
    }

    /// Moves messages whose audio ended on its own back to idle.
    ///
    /// Returns the ids that finished.
    pub fn poll_finished(&mut self) -> Vec<MessageId> {
        let playing: Vec<MessageId> = self
            .states
            .iter()
            .filter(|(_, state)| **state == PlaybackState::Playing)
            .map(|(id, _)| *id)
            .collect();
        let mut finished = Vec::new();
        for id in playing {
            if self.output.is_finished(id) {
                self.states.remove(&id);
                finished.push(id);
            }
        }
        finished.sort();
        finished
    }

    /// Synthesizes `text` with `backend` and plays it for `id`.
    ///
    /// Synthesis failures surface as [`Error::SpeechSynthesis`]; the message
    /// ends idle on every failure path.
    pub async fn speak<B>(&mut self, backend: &B, id: MessageId, text: &str) -> Result<()>
    where
        B: ChatBackend + ?Sized,
    {
        self.begin_loading(id)?;
        let payload = match backend.synthesize_speech(text).await {
            Ok(payload) => payload,
            Err(err) => {
                self.fail_loading(id);
                return Err(match err {
                    Error::SpeechSynthesis { .. } => err,
                    other => Error::speech_synthesis(other.to_string()),
                });
            }
        };
        self.finish_loading(id, &payload)
    }
}

/// What a [`NullOutput`] was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    /// Playback started with this many frames.
    Start(MessageId, usize),
    /// Playback stopped.
    Stop(MessageId),
}

/// An output that plays nothing and records what it was asked to do.
#[derive(Debug, Default)]
pub struct NullOutput {
    active: HashSet<MessageId>,
    events: Vec<OutputEvent>,
    overlapped: bool,
}

impl NullOutput {
    /// Creates a silent output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything started and stopped, in order.
    pub fn events(&self) -> &[OutputEvent] {
        &self.events
    }

    /// True if any message was ever started while already active.
    pub fn overlapped(&self) -> bool {
        self.overlapped
    }

    /// Ends `id` as if its audio ran out.
    pub fn complete(&mut self, id: MessageId) {
        self.active.remove(&id);
    }
}

impl AudioOutput for NullOutput {
    fn start(&mut self, id: MessageId, buffer: &AudioBuffer) -> Result<()> {
        if !self.active.insert(id) {
            self.overlapped = true;
        }
        self.events.push(OutputEvent::Start(id, buffer.frames()));
        Ok(())
    }

    fn stop(&mut self, id: MessageId) {
        self.active.remove(&id);
        self.events.push(OutputEvent::Stop(id));
    }

    fn is_finished(&mut self, id: MessageId) -> bool {
        !self.active.contains(&id)
    }
}

/// Plays audio by writing a WAV file and handing it to an external player.
///
/// The player is invoked as `program [args..] <file.wav>`; stopping kills it.
pub struct CommandOutput {
    program: String,
    args: Vec<String>,
    scratch_dir: PathBuf,
    children: HashMap<MessageId, (Child, PathBuf)>,
}

impl CommandOutput {
    /// Creates an output that runs `program` with `args` plus the WAV path.
    pub fn new(program: impl Into<String>, args: Vec<String>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            scratch_dir: scratch_dir.into(),
            children: HashMap::new(),
        }
    }

    /// Parses a player command line such as `"aplay -q"`.
    pub fn from_command_line(command: &str, scratch_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words
            .next()
            .ok_or_else(|| Error::validation("empty player command", Some("player".to_string())))?;
        Ok(Self::new(program, words.collect(), scratch_dir))
    }

    fn reap(&mut self, id: MessageId) {
        if let Some((mut child, path)) = self.children.remove(&id) {
            let _ = child.kill();
            let _ = child.wait();
            let _ = fs::remove_file(path);
        }
    }
}

impl AudioOutput for CommandOutput {
    fn start(&mut self, id: MessageId, buffer: &AudioBuffer) -> Result<()> {
        self.reap(id);
        fs::create_dir_all(&self.scratch_dir)
            .map_err(|err| Error::io("failed to create audio scratch directory", err))?;
        let path = self
            .scratch_dir
            .join(format!("gemchat-{}-{}.wav", std::process::id(), id.get()));
        fs::write(&path, buffer.to_wav())
            .map_err(|err| Error::io("failed to write audio file", err))?;
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| Error::io(format!("failed to start player {}", self.program), err))?;
        self.children.insert(id, (child, path));
        Ok(())
    }

    fn stop(&mut self, id: MessageId) {
        self.reap(id);
    }

    fn is_finished(&mut self, id: MessageId) -> bool {
        let exited = match self.children.get_mut(&id) {
            Some((child, _)) => !matches!(child.try_wait(), Ok(None)),
            None => return true,
        };
        if exited {
            self.reap(id);
        }
        exited
    }
}

impl Drop for CommandOutput {
    fn drop(&mut self) {
        let ids: Vec<MessageId> = self.children.keys().copied().collect();
        for id in ids {
            self.reap(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment_stream::FragmentStream;
    use crate::{ChatRequest, ErrorKind};
    use base64::Engine;

    fn payload(frames: usize) -> String {
        base64::engine::general_purpose::STANDARD.encode(vec![0u8; frames * 2])
    }

    struct SpeechOnly(Result<String>);

    #[async_trait::async_trait]
    impl ChatBackend for SpeechOnly {
        async fn stream_reply(&self, _request: &ChatRequest) -> Result<FragmentStream> {
            Err(Error::bad_request("speech only"))
        }

        async fn synthesize_speech(&self, _text: &str) -> Result<String> {
            self.0.clone()
        }
    }

    #[test]
    fn idle_loading_playing_idle() {
        let id = MessageId::new(1);
        let mut playback = PlaybackController::new(NullOutput::new());
        assert_eq!(playback.state(id), PlaybackState::Idle);

        playback.begin_loading(id).unwrap();
        assert_eq!(playback.state(id), PlaybackState::Loading);

        playback.finish_loading(id, &payload(10)).unwrap();
        assert_eq!(playback.state(id), PlaybackState::Playing);
        assert_eq!(playback.active(), vec![(id, PlaybackState::Playing)]);

        playback.stop(id);
        assert_eq!(playback.state(id), PlaybackState::Idle);
        assert_eq!(
            playback.output().events(),
            &[OutputEvent::Start(id, 10), OutputEvent::Stop(id)]
        );
    }

    #[test]
    fn restarting_stops_the_running_instance_first() {
        let id = MessageId::new(7);
        let mut playback = PlaybackController::new(NullOutput::new());
        playback.begin_loading(id).unwrap();
        playback.finish_loading(id, &payload(4)).unwrap();

        playback.begin_loading(id).unwrap();
        assert_eq!(playback.state(id), PlaybackState::Loading);
        playback.finish_loading(id, &payload(6)).unwrap();

        assert!(!playback.output().overlapped());
        assert_eq!(
            playback.output().events(),
            &[
                OutputEvent::Start(id, 4),
                OutputEvent::Stop(id),
                OutputEvent::Start(id, 6),
            ]
        );
    }

    #[test]
    fn play_while_playing_never_overlaps() {
        let id = MessageId::new(2);
        let mut playback = PlaybackController::new(NullOutput::new());
        let buffer = decode_speech(&payload(3)).unwrap();
        playback.play(id, &buffer).unwrap();
        playback.play(id, &buffer).unwrap();
        assert!(!playback.output().overlapped());
        assert_eq!(playback.state(id), PlaybackState::Playing);
    }

    #[test]
    fn idle_messages_are_forgotten() {
        let mut playback = PlaybackController::new(NullOutput::new());
        let buffer = decode_speech(&payload(2)).unwrap();
        for n in 0..20 {
            let id = MessageId::new(n);
            playback.begin_loading(id).unwrap();
            if n % 2 == 0 {
                playback.fail_loading(id);
            } else {
                playback.play(id, &buffer).unwrap();
            }
        }
        playback.stop(MessageId::new(1));
        playback.output.complete(MessageId::new(3));
        assert_eq!(playback.poll_finished(), vec![MessageId::new(3)]);
        playback.stop_all();

        assert!(playback.states.is_empty());
        assert!(playback.active().is_empty());
        assert_eq!(playback.state(MessageId::new(1)), PlaybackState::Idle);
    }

    #[test]
    fn loading_cannot_be_restarted() {
        let id = MessageId::new(3);
        let mut playback = PlaybackController::new(NullOutput::new());
        playback.begin_loading(id).unwrap();
        assert!(playback.begin_loading(id).is_err());
        playback.stop(id);
        assert_eq!(playback.state(id), PlaybackState::Loading);
    }

    #[test]
    fn decode_failure_returns_to_idle() {
        let id = MessageId::new(4);
        let mut playback = PlaybackController::new(NullOutput::new());
        playback.begin_loading(id).unwrap();
        let err = playback.finish_loading(id, "AAE").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AudioDecode);
        assert_eq!(playback.state(id), PlaybackState::Idle);
        assert!(playback.output().events().is_empty());
    }

    #[test]
    fn natural_end_returns_to_idle() {
        let a = MessageId::new(5);
        let b = MessageId::new(6);
        let mut playback = PlaybackController::new(NullOutput::new());
        let buffer = decode_speech(&payload(1)).unwrap();
        playback.play(a, &buffer).unwrap();
        playback.play(b, &buffer).unwrap();

        playback.output.complete(a);
        assert_eq!(playback.poll_finished(), vec![a]);
        assert_eq!(playback.state(a), PlaybackState::Idle);
        assert_eq!(playback.state(b), PlaybackState::Playing);

        playback.stop_all();
        assert!(playback.active().is_empty());
    }

    #[tokio::test]
    async fn speak_plays_synthesized_audio() {
        let id = MessageId::new(8);
        let backend = SpeechOnly(Ok(payload(24)));
        let mut playback = PlaybackController::new(NullOutput::new());
        playback.speak(&backend, id, "Hello!").await.unwrap();
        assert_eq!(playback.state(id), PlaybackState::Playing);
        assert_eq!(playback.output().events(), &[OutputEvent::Start(id, 24)]);
    }

    #[tokio::test]
    async fn speak_failure_is_speech_synthesis_error() {
        let id = MessageId::new(9);
        let backend = SpeechOnly(Err(Error::rate_limit("slow", None)));
        let mut playback = PlaybackController::new(NullOutput::new());
        let err = playback.speak(&backend, id, "Hello!").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SpeechSynthesis);
        assert_eq!(playback.state(id), PlaybackState::Idle);
    }

    #[test]
    fn player_command_parsing() {
        let output = CommandOutput::from_command_line("aplay -q", std::env::temp_dir()).unwrap();
        assert_eq!(output.program, "aplay");
        assert_eq!(output.args, vec!["-q".to_string()]);
        assert!(CommandOutput::from_command_line("   ", std::env::temp_dir()).is_err());
    }
}
