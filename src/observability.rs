use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("gemchat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("gemchat.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("gemchat.client.request_duration_seconds");

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("gemchat.stream.chunks");
pub(crate) static STREAM_FRAGMENTS: Counter = Counter::new("gemchat.stream.fragments");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("gemchat.stream.errors");
pub(crate) static STREAM_SAFETY_BLOCKS: Counter = Counter::new("gemchat.stream.safety_blocks");
pub(crate) static STREAM_BYTES: Counter = Counter::new("gemchat.stream.bytes");
pub(crate) static STREAM_TTFF: Moments = Moments::new("gemchat.stream.ttff_seconds");

pub(crate) static SPEECH_REQUESTS: Counter = Counter::new("gemchat.speech.requests");
pub(crate) static SPEECH_ERRORS: Counter = Counter::new("gemchat.speech.errors");
pub(crate) static AUDIO_DECODE_ERRORS: Counter = Counter::new("gemchat.audio.decode_errors");
pub(crate) static PLAYBACK_STARTS: Counter = Counter::new("gemchat.playback.starts");
pub(crate) static PLAYBACK_STOPS: Counter = Counter::new("gemchat.playback.stops");

pub(crate) static SESSION_RESETS: Counter = Counter::new("gemchat.session.resets");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_FRAGMENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_SAFETY_BLOCKS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_TTFF);

    collector.register_counter(&SPEECH_REQUESTS);
    collector.register_counter(&SPEECH_ERRORS);
    collector.register_counter(&AUDIO_DECODE_ERRORS);
    collector.register_counter(&PLAYBACK_STARTS);
    collector.register_counter(&PLAYBACK_STOPS);

    collector.register_counter(&SESSION_RESETS);
}
