//! Speech recognition capability check.
//!
//! A terminal has no microphone API, so the default recognizer reports itself
//! unsupported. Callers check support first and surface
//! [`Error::SpeechRecognitionUnsupported`] instead of attempting capture.

use crate::{Error, Result};

/// Something that can turn spoken input into text.
pub trait SpeechRecognizer: Send {
    /// Whether recognition can run on this host.
    fn is_supported(&self) -> bool;

    /// Captures one utterance and returns its transcript.
    fn listen(&mut self) -> Result<String>;
}

/// Fails with [`Error::SpeechRecognitionUnsupported`] if `recognizer` cannot run.
pub fn ensure_supported(recognizer: &dyn SpeechRecognizer) -> Result<()> {
    if recognizer.is_supported() {
        Ok(())
    } else {
        Err(Error::SpeechRecognitionUnsupported)
    }
}

/// Checks support, then listens.
pub fn listen(recognizer: &mut dyn SpeechRecognizer) -> Result<String> {
    ensure_supported(recognizer)?;
    recognizer.listen()
}

/// The recognizer used when the host offers none.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unsupported;

impl SpeechRecognizer for Unsupported {
    fn is_supported(&self) -> bool {
        false
    }

    fn listen(&mut self) -> Result<String> {
        Err(Error::SpeechRecognitionUnsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    struct Scripted(Vec<String>);

    impl SpeechRecognizer for Scripted {
        fn is_supported(&self) -> bool {
            true
        }

        fn listen(&mut self) -> Result<String> {
            self.0
                .pop()
                .ok_or_else(|| Error::validation("nothing heard", None))
        }
    }

    #[test]
    fn unsupported_host() {
        let mut recognizer = Unsupported;
        let err = ensure_supported(&recognizer).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SpeechRecognitionUnsupported);
        assert_eq!(
            listen(&mut recognizer).unwrap_err().kind(),
            ErrorKind::SpeechRecognitionUnsupported
        );
    }

    #[test]
    fn supported_recognizer_transcribes() {
        let mut recognizer = Scripted(vec!["hello there".to_string()]);
        assert!(ensure_supported(&recognizer).is_ok());
        assert_eq!(listen(&mut recognizer).unwrap(), "hello there");
    }
}
