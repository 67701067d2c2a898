use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sound {
    pub name: &'static str,
    pub url: &'static str,
}

pub const MODIFIED_SOUND: Sound = Sound {
    name: "modified",
    url: "mp3/decision50.mp3",
};

pub const CORRECT_ALL_SOUND: Sound = Sound {
    name: "correctAll",
    url: "mp3/correct1.mp3",
};

pub const CUE_SOUNDS: &[Sound] = &[MODIFIED_SOUND, CORRECT_ALL_SOUND];

pub const DEFAULT_VOLUME: f32 = 1.0;

#[derive(Debug, Clone, thiserror::Error)]
pub enum AudioError {
    #[error("audio output is locked until the first user input")]
    Locked,
    #[error("fetching {url} failed: {reason}")]
    Fetch { url: String, reason: String },
    #[error("decoding {url} failed: {reason}")]
    Decode { url: String, reason: String },
    #[error("playback failed: {0}")]
    Playback(String),
}

/// Platform audio output.
#[allow(async_fn_in_trait)]
pub trait AudioBackend {
    type Buffer;

    async fn decode(&self, url: &str) -> Result<Self::Buffer, AudioError>;

    fn start(&self, buffer: &Self::Buffer, volume: f32) -> Result<(), AudioError>;
}

/// Decoded sounds by name, usable once audio has been unlocked.
pub struct AudioBank<B: AudioBackend> {
    backend: B,
    buffers: HashMap<String, B::Buffer>,
    unlocked: bool,
}

impl<B: AudioBackend> AudioBank<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            buffers: HashMap::new(),
            unlocked: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.buffers.contains_key(name)
    }

    /// Unlocks output and loads the cue sounds. Only the first call does
    /// anything; returns whether this call unlocked.
    pub async fn unlock(&mut self) -> bool {
        if self.unlocked {
            return false;
        }
        self.unlocked = true;
        for sound in CUE_SOUNDS {
            // failures are logged by load and leave the name absent
            let _ = self.load(sound.name, sound.url).await;
        }
        true
    }

    /// Decodes `url` under `name` unless that name is already cached.
    pub async fn load(&mut self, name: &str, url: &str) -> Result<(), AudioError> {
        if !self.unlocked {
            return Err(AudioError::Locked);
        }
        if self.buffers.contains_key(name) {
            return Ok(());
        }
        match self.backend.decode(url).await {
            Ok(buffer) => {
                tracing::debug!(name, url, "sound loaded");
                self.buffers.insert(name.to_string(), buffer);
                Ok(())
            }
            Err(err) => {
                tracing::error!(name, url, %err, "sound load failed");
                Err(err)
            }
        }
    }

    /// Plays a cached sound; a no-op while locked or when `name` is unknown.
    pub fn play(&self, name: &str, volume: f32) {
        if !self.unlocked {
            tracing::debug!(name, "audio locked, cue skipped");
            return;
        }
        let Some(buffer) = self.buffers.get(name) else {
            tracing::warn!(name, "sound not loaded");
            return;
        };
        if let Err(err) = self.backend.start(buffer, volume) {
            tracing::warn!(name, %err, "sound playback failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        decoded: RefCell<Vec<String>>,
        played: RefCell<Vec<(String, f32)>>,
    }

    impl AudioBackend for Recorder {
        type Buffer = String;

        async fn decode(&self, url: &str) -> Result<String, AudioError> {
            self.decoded.borrow_mut().push(url.to_string());
            if url.contains("broken") {
                return Err(AudioError::Decode {
                    url: url.to_string(),
                    reason: "bad header".to_string(),
                });
            }
            Ok(url.to_string())
        }

        fn start(&self, buffer: &String, volume: f32) -> Result<(), AudioError> {
            self.played.borrow_mut().push((buffer.clone(), volume));
            Ok(())
        }
    }

    #[tokio::test]
    async fn locked_bank_plays_nothing() {
        let mut bank = AudioBank::new(Recorder::default());
        bank.play(MODIFIED_SOUND.name, DEFAULT_VOLUME);
        assert!(matches!(
            bank.load("x", "x.mp3").await,
            Err(AudioError::Locked)
        ));
        assert!(bank.backend().played.borrow().is_empty());
    }

    #[tokio::test]
    async fn unlock_loads_cues_once() {
        let mut bank = AudioBank::new(Recorder::default());
        assert!(bank.unlock().await);
        assert!(!bank.unlock().await);
        assert_eq!(bank.backend().decoded.borrow().len(), CUE_SOUNDS.len());
        bank.play(CORRECT_ALL_SOUND.name, 0.5);
        assert_eq!(
            bank.backend().played.borrow().as_slice(),
            &[(CORRECT_ALL_SOUND.url.to_string(), 0.5)]
        );
    }

    #[tokio::test]
    async fn failed_decode_leaves_name_absent() {
        let mut bank = AudioBank::new(Recorder::default());
        bank.unlock().await;
        assert!(bank.load("bad", "broken.mp3").await.is_err());
        assert!(!bank.is_loaded("bad"));
        bank.play("bad", DEFAULT_VOLUME);
        assert!(bank.backend().played.borrow().is_empty());
        bank.load(MODIFIED_SOUND.name, "other.mp3").await.expect("cached");
        assert_eq!(bank.backend().decoded.borrow().len(), CUE_SOUNDS.len() + 1);
    }
}
