//! Turns streamed response chunks into text fragments while accumulating the reply.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use futures::Stream;
use futures::stream;

use crate::observability::{
    STREAM_CHUNKS, STREAM_ERRORS, STREAM_FRAGMENTS, STREAM_SAFETY_BLOCKS, STREAM_TTFF,
};
use crate::{
    Candidate, ClientLogger, Content, Error, GenerateContentResponse, Result, Role,
};

type ChunkStream = Pin<Box<dyn Stream<Item = Result<GenerateContentResponse>> + Send>>;

/// A stream of text fragments whose concatenation is the model's reply.
///
/// Chunks without answer text are skipped. A chunk that reports a safety stop
/// (or a blocked prompt) ends the stream with [`Error::SafetyBlocked`]; after
/// the first error nothing more is yielded. The text seen so far is kept and
/// can be read back with [`FragmentStream::partial_reply`].
pub struct FragmentStream {
    inner: ChunkStream,
    reply: String,
    logger: Option<Arc<dyn ClientLogger>>,
    started: Instant,
    first_fragment_seen: bool,
    done: bool,
}

impl FragmentStream {
    /// Wraps a chunk stream.
    pub fn new<S>(chunks: S) -> Self
    where
        S: Stream<Item = Result<GenerateContentResponse>> + Send + 'static,
    {
        Self {
            inner: Box::pin(chunks),
            reply: String::new(),
            logger: None,
            started: Instant::now(),
            first_fragment_seen: false,
            done: false,
        }
    }

    /// Builds a stream that yields the given fragments in order.
    ///
    /// Each `Ok` becomes one single-part chunk; an `Err` is surfaced as-is.
    pub fn from_fragments<I>(fragments: I) -> Self
    where
        I: IntoIterator<Item = Result<String>>,
    {
        let chunks: Vec<Result<GenerateContentResponse>> = fragments
            .into_iter()
            .map(|fragment| {
                fragment.map(|text| GenerateContentResponse {
                    candidates: vec![Candidate {
                        content: Some(Content::text(Role::Model, text)),
                        finish_reason: None,
                    }],
                    ..GenerateContentResponse::default()
                })
            })
            .collect();
        Self::new(stream::iter(chunks))
    }

    /// Attaches a logger that sees every chunk.
    pub fn with_logger(mut self, logger: Option<Arc<dyn ClientLogger>>) -> Self {
        self.logger = logger;
        self
    }

    /// The reply accumulated so far.
    pub fn partial_reply(&self) -> &str {
        &self.reply
    }

    /// True once the stream has ended, by exhaustion or by error.
    pub fn is_done(&self) -> bool {
        self.done
    }

    fn fail(&mut self, err: Error) -> Poll<Option<Result<String>>> {
        self.done = true;
        STREAM_ERRORS.click();
        if err.is_safety_blocked() {
            STREAM_SAFETY_BLOCKS.click();
        }
        Poll::Ready(Some(Err(err)))
    }

    fn finish(&mut self) -> Poll<Option<Result<String>>> {
        self.done = true;
        Poll::Ready(None)
    }

    /// Classifies a chunk: its text, or the safety error it carries.
    fn inspect(chunk: &GenerateContentResponse) -> Result<String> {
        if let Some(reason) = chunk.block_reason() {
            return Err(Error::safety_blocked(
                "the prompt was blocked",
                Some(reason.to_string()),
            ));
        }
        let text = chunk.text();
        if let Some(reason) = chunk.finish_reason()
            && reason.is_safety()
        {
            return Err(Error::safety_blocked(
                "the reply was withheld",
                Some(reason.as_str().to_string()),
            ));
        }
        Ok(text)
    }
}

impl Stream for FragmentStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        loop {
            match self.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    STREAM_CHUNKS.click();
                    if let Some(logger) = &self.logger {
                        logger.log_stream_chunk(&chunk);
                    }
                    match Self::inspect(&chunk) {
                        Ok(text) if text.is_empty() => continue,
                        Ok(text) => {
                            if !self.first_fragment_seen {
                                self.first_fragment_seen = true;
                                STREAM_TTFF.add(self.started.elapsed().as_secs_f64());
                            }
                            STREAM_FRAGMENTS.click();
                            self.reply.push_str(&text);
                            return Poll::Ready(Some(Ok(text)));
                        }
                        Err(err) => return self.fail(err),
                    }
                }
                Poll::Ready(Some(Err(err))) => return self.fail(err),
                Poll::Ready(None) => return self.finish(),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, FinishReason};
    use futures::StreamExt;

    fn chunk(text: &str, finish: Option<FinishReason>) -> Result<GenerateContentResponse> {
        Ok(GenerateContentResponse {
            candidates: vec![Candidate {
                content: Some(Content::model(text)),
                finish_reason: finish,
            }],
            ..GenerateContentResponse::default()
        })
    }

    #[tokio::test]
    async fn yields_fragments_and_accumulates() {
        let chunks = vec![
            chunk("Hel", None),
            chunk("", None),
            chunk("lo!", Some(FinishReason::Stop)),
        ];
        let mut fragments = FragmentStream::new(stream::iter(chunks));

        let mut seen = Vec::new();
        while let Some(fragment) = fragments.next().await {
            seen.push(fragment.unwrap());
        }
        assert_eq!(seen, vec!["Hel".to_string(), "lo!".to_string()]);
        assert_eq!(fragments.partial_reply(), "Hello!");
        assert!(fragments.is_done());
    }

    #[tokio::test]
    async fn safety_finish_ends_stream() {
        let chunks = vec![
            chunk("Partial", None),
            chunk("", Some(FinishReason::Safety)),
            chunk("never seen", None),
        ];
        let mut fragments = FragmentStream::new(stream::iter(chunks));

        assert_eq!(fragments.next().await.unwrap().unwrap(), "Partial");
        assert!(!fragments.is_done());
        let err = fragments.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SafetyBlocked);
        assert!(fragments.is_done());
        assert!(fragments.next().await.is_none());
        assert_eq!(fragments.partial_reply(), "Partial");
    }

    #[tokio::test]
    async fn blocked_prompt_is_safety_error() {
        let blocked = GenerateContentResponse {
            prompt_feedback: Some(crate::PromptFeedback {
                block_reason: Some("OTHER".to_string()),
            }),
            ..GenerateContentResponse::default()
        };
        let mut fragments = FragmentStream::new(stream::iter(vec![Ok(blocked)]));
        let err = fragments.next().await.unwrap().unwrap_err();
        assert!(err.is_safety_blocked());
    }

    #[tokio::test]
    async fn transport_error_terminates() {
        let mut fragments = FragmentStream::from_fragments(vec![
            Ok("a".to_string()),
            Err(Error::service_unavailable("overloaded", 503)),
            Ok("b".to_string()),
        ]);
        assert_eq!(fragments.next().await.unwrap().unwrap(), "a");
        assert_eq!(fragments.partial_reply(), "a");
        let err = fragments.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
        assert!(fragments.next().await.is_none());
    }
}
