//! Off-thread synthesis. Buffers move into a request and come back in the
//! response, so neither side ever aliases the other's copy.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread;

use bevy::log::{debug, warn};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use super::buffer::SurfaceBuffers;
use super::error::TextureError;
use super::layers::NoiseConfiguration;
use super::synth::synthesize;

#[derive(Debug)]
pub struct SynthesisRequest {
    // pipeline generation the request belongs to
    pub generation: u64,
    pub tier: usize,
    pub seed: i32,
    pub config: NoiseConfiguration,
    pub buffers: SurfaceBuffers,
}

#[derive(Debug)]
pub struct SynthesisResponse {
    pub generation: u64,
    pub tier: usize,
    pub result: Result<SurfaceBuffers, TextureError>,
}

/// Asynchronous link to whatever runs the synthesizer.
pub trait SynthesisChannel: Send + Sync {
    /// Hands the request over without waiting for it to run.
    fn submit(&mut self, request: SynthesisRequest) -> Result<(), TextureError>;

    /// Next finished response, if any. `Err` means the worker is gone.
    fn try_receive(&mut self) -> Result<Option<SynthesisResponse>, TextureError>;
}

/// Runs one request to completion, turning a panic into a failed result.
pub fn run_request(request: SynthesisRequest) -> SynthesisResponse {
    let SynthesisRequest {
        generation,
        tier,
        seed,
        config,
        buffers,
    } = request;

    let result = catch_unwind(AssertUnwindSafe(|| synthesize(seed, &config, buffers)))
        .unwrap_or_else(|_| Err(TextureError::Synthesis("synthesizer panicked".to_string())));

    SynthesisResponse {
        generation,
        tier,
        result,
    }
}

/// Dedicated synthesis thread fed through unbounded channels.
pub struct WorkerThread {
    requests: UnboundedSender<SynthesisRequest>,
    responses: UnboundedReceiver<SynthesisResponse>,
}

impl WorkerThread {
    pub fn spawn() -> Result<Self, TextureError> {
        let (request_tx, mut request_rx) = unbounded_channel::<SynthesisRequest>();
        let (response_tx, response_rx) = unbounded_channel::<SynthesisResponse>();

        thread::Builder::new()
            .name("terrain-synth".to_string())
            .spawn(move || {
                while let Some(request) = request_rx.blocking_recv() {
                    debug!(
                        "synthesizing tier {} (generation {})",
                        request.tier, request.generation
                    );
                    if response_tx.send(run_request(request)).is_err() {
                        // coordinator went away
                        break;
                    }
                }
            })?;

        Ok(Self {
            requests: request_tx,
            responses: response_rx,
        })
    }
}

impl SynthesisChannel for WorkerThread {
    fn submit(&mut self, request: SynthesisRequest) -> Result<(), TextureError> {
        self.requests
            .send(request)
            .map_err(|_| TextureError::WorkerUnavailable)
    }

    fn try_receive(&mut self) -> Result<Option<SynthesisResponse>, TextureError> {
        match self.responses.try_recv() {
            Ok(response) => Ok(Some(response)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                warn!("terrain synthesis thread has stopped");
                Err(TextureError::WorkerUnavailable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlanetOptions;
    use crate::generation::buffer::prepare_base;
    use crate::generation::gradient::generate_gradient;
    use image::{Rgba, RgbaImage};
    use std::time::{Duration, Instant};

    fn request(generation: u64, resolution: u32) -> SynthesisRequest {
        let reference = RgbaImage::from_pixel(8, 8, Rgba([200, 128, 60, 255]));
        SynthesisRequest {
            generation,
            tier: 0,
            seed: 5,
            config: NoiseConfiguration::from_options(&PlanetOptions::default()).unwrap(),
            buffers: prepare_base(&reference, resolution, &generate_gradient(5)).unwrap(),
        }
    }

    fn wait_for(worker: &mut WorkerThread) -> SynthesisResponse {
        let start = Instant::now();
        loop {
            if let Some(response) = worker.try_receive().unwrap() {
                return response;
            }
            assert!(start.elapsed() < Duration::from_secs(30), "worker never answered");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn worker_answers_with_the_same_generation() {
        let mut worker = WorkerThread::spawn().unwrap();
        worker.submit(request(9, 16)).unwrap();

        let response = wait_for(&mut worker);
        assert_eq!(response.generation, 9);
        assert_eq!(response.result.unwrap().resolution(), 16);
    }

    #[test]
    fn worker_matches_inline_synthesis() {
        let mut worker = WorkerThread::spawn().unwrap();
        worker.submit(request(1, 16)).unwrap();
        let threaded = wait_for(&mut worker).result.unwrap();
        let inline = run_request(request(1, 16)).result.unwrap();
        assert_eq!(threaded, inline);
    }

    #[test]
    fn failures_come_back_as_results() {
        let mut bad = request(3, 16);
        bad.buffers.diffuse = RgbaImage::new(4, 4);
        let response = run_request(bad);
        assert!(response.result.is_err());
    }

    #[test]
    fn empty_channel_is_not_an_error() {
        let mut worker = WorkerThread::spawn().unwrap();
        assert!(worker.try_receive().unwrap().is_none());
    }
}
