use std::cell::RefCell;
use std::rc::Rc;

use nurie_core::{AudioBackend, AudioError};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{AudioBuffer, AudioContext};

use crate::fetch::{fetch_response, js_reason};

/// Web Audio playback. The context is created on the first user gesture;
/// clones share it.
#[derive(Clone, Default)]
pub(crate) struct WebAudio {
    context: Rc<RefCell<Option<AudioContext>>>,
}

impl WebAudio {
    /// Creates the context, or resumes a suspended one. Must run inside a
    /// gesture handler for browsers to allow sound.
    pub(crate) fn resume(&self) {
        let mut slot = self.context.borrow_mut();
        if let Some(context) = slot.as_ref() {
            if let Err(err) = context.resume() {
                gloo::console::warn!("audio resume failed", err);
            }
            return;
        }
        match AudioContext::new() {
            Ok(context) => *slot = Some(context),
            Err(err) => gloo::console::warn!("audio context unavailable", err),
        }
    }

    fn context(&self) -> Result<AudioContext, AudioError> {
        if self.context.borrow().is_none() {
            self.resume();
        }
        self.context
            .borrow()
            .clone()
            .ok_or_else(|| AudioError::Playback("no audio context".to_string()))
    }
}

impl AudioBackend for WebAudio {
    type Buffer = AudioBuffer;

    async fn decode(&self, url: &str) -> Result<AudioBuffer, AudioError> {
        let fetch_err = |err: JsValue| AudioError::Fetch {
            url: url.to_string(),
            reason: js_reason(&err),
        };
        let decode_err = |err: JsValue| AudioError::Decode {
            url: url.to_string(),
            reason: js_reason(&err),
        };
        let response = fetch_response(url).await.map_err(fetch_err)?;
        if !response.ok() {
            return Err(AudioError::Fetch {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }
        let bytes = wasm_bindgen_futures::JsFuture::from(response.array_buffer().map_err(fetch_err)?)
            .await
            .map_err(fetch_err)?;
        let bytes = bytes.dyn_into::<js_sys::ArrayBuffer>().map_err(decode_err)?;
        let context = self.context()?;
        let promise = context.decode_audio_data(&bytes).map_err(decode_err)?;
        let buffer = wasm_bindgen_futures::JsFuture::from(promise)
            .await
            .map_err(decode_err)?;
        buffer.dyn_into::<AudioBuffer>().map_err(decode_err)
    }

    fn start(&self, buffer: &AudioBuffer, volume: f32) -> Result<(), AudioError> {
        let playback = |err: JsValue| AudioError::Playback(js_reason(&err));
        let context = self.context()?;
        let source = context.create_buffer_source().map_err(playback)?;
        source.set_buffer(Some(buffer));
        let gain = context.create_gain().map_err(playback)?;
        gain.gain().set_value(volume);
        source.connect_with_audio_node(&gain).map_err(playback)?;
        gain.connect_with_audio_node(&context.destination())
            .map_err(playback)?;
        source.start().map_err(playback)
    }
}
