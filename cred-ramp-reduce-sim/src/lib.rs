//! In-process, `Vec`-backed implementation of `cred_ramp_reduce::stream`'s
//! traits — the analogue of `ci2-simple-demo`/`ci2-simple-async-demo`: no
//! real shared memory, semaphores, or process registration, just enough to
//! drive the engine from code (tests, the demo CLI, benchmarks).

use std::collections::VecDeque;

use cred_ramp_reduce::{CredInputStream, CredOutputStream, KeywordValue, RawKind, RawSamples};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("input stream exhausted: no more frames queued")]
    Exhausted,
    #[error(transparent)]
    Core(#[from] cred_ramp_reduce::Error),
}

/// A queued raw frame, one element array per camera datatype.
#[derive(Debug, Clone)]
pub enum RawBuffer {
    U16(Vec<u16>),
    S16(Vec<i16>),
}

impl RawBuffer {
    fn kind(&self) -> RawKind {
        match self {
            RawBuffer::U16(_) => RawKind::U16,
            RawBuffer::S16(_) => RawKind::S16,
        }
    }

    fn as_samples(&self) -> RawSamples<'_> {
        match self {
            RawBuffer::U16(v) => RawSamples::U16(v),
            RawBuffer::S16(v) => RawSamples::S16(v),
        }
    }
}

/// A `Vec`-backed input stream: frames are queued ahead of time with
/// [`VecInputStream::push_frame`]; [`CredInputStream::wait_next_frame`]
/// simply pops the next one, returning [`Error::Exhausted`] once the queue
/// is empty (there is nothing to block on in a test double).
#[derive(Debug)]
pub struct VecInputStream {
    width: u32,
    height: u32,
    kind: RawKind,
    queue: VecDeque<(RawBuffer, Vec<(String, KeywordValue)>)>,
    current: Option<(RawBuffer, Vec<(String, KeywordValue)>)>,
}

impl VecInputStream {
    pub fn new(width: u32, height: u32, kind: RawKind) -> Self {
        Self {
            width,
            height,
            kind,
            queue: VecDeque::new(),
            current: None,
        }
    }

    /// Queue a frame whose only keyword is `NDR`.
    pub fn push_frame(&mut self, buf: RawBuffer, ndr: i64) {
        self.push_frame_with_keywords(buf, vec![("NDR".to_string(), KeywordValue::Int(ndr))]);
    }

    pub fn push_frame_with_keywords(
        &mut self,
        buf: RawBuffer,
        keywords: Vec<(String, KeywordValue)>,
    ) {
        assert_eq!(buf.kind(), self.kind, "frame datatype does not match stream");
        self.queue.push_back((buf, keywords));
    }

    pub fn is_exhausted(&self) -> bool {
        self.queue.is_empty()
    }
}

impl CredInputStream for VecInputStream {
    fn wait_next_frame(&mut self) -> cred_ramp_reduce::Result<()> {
        match self.queue.pop_front() {
            Some(next) => {
                self.current = Some(next);
                Ok(())
            }
            None => {
                tracing::error!("VecInputStream exhausted");
                // The core crate's Result carries only fatal/structural
                // errors (spec §7); running out of synthetic frames in a
                // test double has no spec-level meaning, so it is reported
                // through this crate's own Error, not the core's.
                Err(cred_ramp_reduce::Error::StreamResolution {
                    name: "<exhausted sim stream>".to_string(),
                })
            }
        }
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn samples(&self) -> RawSamples<'_> {
        self.current
            .as_ref()
            .expect("samples() called before wait_next_frame()")
            .0
            .as_samples()
    }

    fn keyword_i64(&self, name: &str) -> Option<i64> {
        self.current.as_ref().and_then(|(_, kws)| {
            kws.iter().find(|(n, _)| n == name).and_then(|(_, v)| match v {
                KeywordValue::Int(i) => Some(*i),
                _ => None,
            })
        })
    }

    fn keywords(&self) -> &[(String, KeywordValue)] {
        self.current
            .as_ref()
            .map(|(_, kws)| kws.as_slice())
            .unwrap_or(&[])
    }
}

/// A `Vec`-backed output stream: [`CredOutputStream::publish`] snapshots the
/// pixel buffer and keywords into `published`, so tests can assert on every
/// emitted frame in order.
#[derive(Debug, Default)]
pub struct VecOutputStream {
    width: u32,
    height: u32,
    pixels: Vec<f32>,
    keywords: Vec<(String, KeywordValue)>,
    pub published: Vec<PublishedFrame>,
}

#[derive(Debug, Clone)]
pub struct PublishedFrame {
    pub pixels: Vec<f32>,
    pub keywords: Vec<(String, KeywordValue)>,
}

impl VecOutputStream {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredOutputStream for VecOutputStream {
    fn ensure_shape(&mut self, width: u32, height: u32) -> cred_ramp_reduce::Result<()> {
        let n_pixels = width as usize * height as usize;
        if self.width != width || self.height != height || self.pixels.len() != n_pixels {
            self.width = width;
            self.height = height;
            self.pixels = vec![0.0; n_pixels];
        }
        Ok(())
    }

    fn pixels_mut(&mut self) -> &mut [f32] {
        &mut self.pixels
    }

    fn set_keywords(&mut self, kws: &[(String, KeywordValue)]) {
        self.keywords = kws.to_vec();
    }

    fn publish(&mut self) -> cred_ramp_reduce::Result<()> {
        self.published.push(PublishedFrame {
            pixels: self.pixels.clone(),
            keywords: self.keywords.clone(),
        });
        Ok(())
    }
}
