//! Progressive refinement of the planet surface textures.
//!
//! Each resolution tier goes through the same fixed sequence on the
//! coordinating thread: base buffers, hand-off to the worker, commit of the
//! returned buffers plus a derived normal map, one atomic rebind of the
//! material, then deferred disposal of the set it replaced. Tiers never
//! overlap; the next one is prepared only after the previous commit.

use std::time::Duration;

use bevy::log::{debug, error, info};

use crate::config::{PlanetOptions, RESOLUTION_TIERS, SUPERSEDED_GRACE, TEARDOWN_GRACE};

use super::atmosphere::AtmosphereLook;
use super::buffer::{PixelBuffer, SurfaceBuffers, prepare_base};
use super::disposal::DisposalQueue;
use super::error::TextureError;
use super::gradient::{ColorStop, generate_gradient};
use super::layers::NoiseConfiguration;
use super::normal::derive_normal_map;
use super::seed::hash_seed;
use super::worker::{SynthesisChannel, SynthesisRequest, SynthesisResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Height,
    Specular,
    Diffuse,
    Normal,
}

/// What a material's texture slots point at after a commit
pub struct MaterialSlots<'a, T> {
    pub diffuse: &'a T,
    pub specular: &'a T,
    pub normal: &'a T,
    pub bump_level: f32,
}

/// The engine side of the pipeline: texture/material objects.
pub trait RenderBackend {
    type Texture;
    type Material: Clone;

    /// New material in its untextured state.
    fn create_material(&mut self, label: &str) -> Self::Material;

    fn upload(&mut self, kind: TextureKind, buffer: &PixelBuffer) -> Self::Texture;

    /// Points every slot at the new textures in one step; a render must
    /// never see a mix of old and new slots.
    fn bind(&mut self, material: &Self::Material, slots: MaterialSlots<'_, Self::Texture>);

    fn release_texture(&mut self, texture: Self::Texture);

    fn release_material(&mut self, material: Self::Material);
}

/// Finished pixel data of one tier
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceMaps {
    pub height: PixelBuffer,
    pub specular: PixelBuffer,
    pub diffuse: PixelBuffer,
    pub normal: PixelBuffer,
}

#[derive(Debug)]
pub struct TierTextures<T> {
    pub height: T,
    pub specular: T,
    pub diffuse: T,
    pub normal: T,
}

impl<T> TierTextures<T> {
    fn into_array(self) -> [T; 4] {
        [self.height, self.specular, self.diffuse, self.normal]
    }
}

/// One tier's maps together with their engine textures.
#[derive(Debug)]
pub struct TextureSet<T> {
    pub tier: usize,
    pub resolution: u32,
    pub maps: SurfaceMaps,
    pub textures: TierTextures<T>,
}

// things waiting out the grace delay
enum Retired<T, M> {
    Textures(TextureSet<T>),
    Material(M),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Synthesizing { tier: usize, resolution: u32 },
    Committed { tier: usize, resolution: u32 },
    Settled { resolution: u32 },
    // a tier failed, whatever was committed before stays live
    Halted { last_committed: Option<u32> },
    Disposed,
}

/// Strictly increasing list of square resolutions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierSchedule(Vec<u32>);

impl TierSchedule {
    pub fn new(resolutions: Vec<u32>) -> Result<Self, TextureError> {
        let increasing = resolutions.windows(2).all(|w| w[0] < w[1]);
        if resolutions.is_empty() || resolutions[0] == 0 || !increasing {
            return Err(TextureError::InvalidTiers);
        }
        Ok(Self(resolutions))
    }

    pub fn resolution(&self, tier: usize) -> u32 {
        self.0[tier]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_final(&self, tier: usize) -> bool {
        tier + 1 == self.len()
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub tiers: TierSchedule,
    pub grace: Duration,
    pub teardown_grace: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            tiers: TierSchedule(RESOLUTION_TIERS.to_vec()),
            grace: SUPERSEDED_GRACE,
            teardown_grace: TEARDOWN_GRACE,
        }
    }
}

/// Normal map blend weight: gentle on the coarse first tier, stronger once
/// more height detail exists.
pub fn bump_level(tier: usize, roughness: u8) -> f32 {
    if tier == 0 {
        0.2
    } else if roughness > 0 {
        0.45
    } else {
        0.05
    }
}

pub struct ProgressiveTextureCoordinator<T, M> {
    label: String,
    options: PlanetOptions,
    seed: i32,
    gradient: Vec<ColorStop>,
    config: NoiseConfiguration,
    settings: PipelineSettings,
    reference: PixelBuffer,
    channel: Box<dyn SynthesisChannel>,
    // bumped whenever in-flight work must be ignored
    generation: u64,
    state: PipelineState,
    material: Option<M>,
    live: Option<TextureSet<T>>,
    disposal: DisposalQueue<Retired<T, M>>,
}

impl<T, M: Clone> ProgressiveTextureCoordinator<T, M> {
    pub fn new(
        label: impl Into<String>,
        options: PlanetOptions,
        reference: PixelBuffer,
        channel: Box<dyn SynthesisChannel>,
        settings: PipelineSettings,
    ) -> Result<Self, TextureError> {
        if reference.width() == 0 || reference.height() == 0 {
            return Err(TextureError::Reference("reference image is empty".to_string()));
        }

        let config = NoiseConfiguration::from_options(&options)?;
        let seed = hash_seed(&options.terrain_seed);

        Ok(Self {
            label: label.into(),
            gradient: generate_gradient(seed),
            options,
            seed,
            config,
            settings,
            reference,
            channel,
            generation: 0,
            state: PipelineState::Idle,
            material: None,
            live: None,
            disposal: DisposalQueue::new(),
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn options(&self) -> &PlanetOptions {
        &self.options
    }

    pub fn seed(&self) -> i32 {
        self.seed
    }

    pub fn noise_configuration(&self) -> &NoiseConfiguration {
        &self.config
    }

    /// Current material, if one has been requested.
    pub fn material(&self) -> Option<&M> {
        self.material.as_ref()
    }

    pub fn live_set(&self) -> Option<&TextureSet<T>> {
        self.live.as_ref()
    }

    pub fn pending_disposals(&self) -> usize {
        self.disposal.len()
    }

    pub fn atmosphere_look(&self) -> AtmosphereLook {
        AtmosphereLook::from_options(&self.options)
    }

    /// Creates the material and kicks off the first tier if that has not
    /// happened yet. Safe to call every frame.
    pub fn ensure_started<B>(&mut self, backend: &mut B, now: Duration) -> Result<(), TextureError>
    where
        B: RenderBackend<Texture = T, Material = M>,
    {
        if self.state == PipelineState::Disposed {
            return Err(TextureError::Disposed);
        }

        if self.material.is_none() {
            self.material = Some(backend.create_material(&self.label));
        }
        if self.state == PipelineState::Idle {
            self.start_tier(0, now);
        }

        Ok(())
    }

    /// Returns the bound material straight away. Until the first commit it
    /// renders untextured.
    pub fn request_material<B>(&mut self, backend: &mut B, now: Duration) -> Result<M, TextureError>
    where
        B: RenderBackend<Texture = T, Material = M>,
    {
        self.ensure_started(backend, now)?;
        self.material().cloned().ok_or(TextureError::Disposed)
    }

    /// Swaps in a new noise configuration and restarts from the base tier.
    ///
    /// Anything still in flight for the old configuration is ignored when it
    /// arrives. The live textures and material are retired through the
    /// grace delay, never released here.
    pub fn set_noise_configuration<B>(
        &mut self,
        config: NoiseConfiguration,
        backend: &mut B,
        now: Duration,
    ) -> Result<(), TextureError>
    where
        B: RenderBackend<Texture = T, Material = M>,
    {
        if self.state == PipelineState::Disposed {
            return Err(TextureError::Disposed);
        }

        self.generation += 1;
        let started = self.material.is_some();
        self.retire_live(now, self.settings.grace);
        self.config = config;
        self.state = PipelineState::Idle;
        info!(
            "{}: noise configuration replaced ({} layers)",
            self.label,
            self.config.len()
        );

        if started {
            self.ensure_started(backend, now)?;
        }
        Ok(())
    }

    /// Replaces the planet options and rebuilds the noise stack from them.
    /// A new terrain seed also brings a new colour ramp.
    pub fn set_options<B>(
        &mut self,
        options: PlanetOptions,
        backend: &mut B,
        now: Duration,
    ) -> Result<(), TextureError>
    where
        B: RenderBackend<Texture = T, Material = M>,
    {
        options.validate()?;
        let config = NoiseConfiguration::from_options(&options)?;

        if options.terrain_seed != self.options.terrain_seed {
            self.seed = hash_seed(&options.terrain_seed);
            self.gradient = generate_gradient(self.seed);
        }
        self.options = options;
        self.set_noise_configuration(config, backend, now)
    }

    /// Per-frame drive: releases expired resources, starts the tier after
    /// the last commit, then commits whatever the worker has finished.
    ///
    /// A commit stays visible as `Committed` until the next call.
    pub fn update<B>(&mut self, backend: &mut B, now: Duration)
    where
        B: RenderBackend<Texture = T, Material = M>,
    {
        self.release_due(backend, now);

        if let PipelineState::Committed { tier, .. } = self.state {
            self.start_tier(tier + 1, now);
        }

        loop {
            match self.channel.try_receive() {
                Ok(Some(response)) => self.handle_response(response, backend, now),
                Ok(None) => break,
                Err(e) => {
                    if matches!(self.state, PipelineState::Synthesizing { .. }) {
                        self.halt(&e);
                    }
                    break;
                }
            }
        }
    }

    /// Retires the live set and material. Destruction still waits for the
    /// grace delay so the renderer is never left holding a dead texture.
    pub fn dispose(&mut self, now: Duration) {
        if self.state == PipelineState::Disposed {
            return;
        }

        self.generation += 1;
        if let Some(live) = self.live.take() {
            self.disposal
                .schedule(Retired::Textures(live), now, self.settings.grace);
        }
        if let Some(material) = self.material.take() {
            self.disposal
                .schedule(Retired::Material(material), now, self.settings.teardown_grace);
        }
        self.state = PipelineState::Disposed;
        info!("{}: disposed", self.label);
    }

    /// Releases everything still waiting, regardless of delay.
    pub fn flush<B>(&mut self, backend: &mut B)
    where
        B: RenderBackend<Texture = T, Material = M>,
    {
        if self.disposal.is_empty() {
            return;
        }
        debug!("{}: flushing {} retired resources", self.label, self.disposal.len());
        for retired in self.disposal.drain() {
            release(backend, retired);
        }
    }

    fn release_due<B>(&mut self, backend: &mut B, now: Duration)
    where
        B: RenderBackend<Texture = T, Material = M>,
    {
        if self.disposal.next_due().is_none_or(|due| due > now) {
            return;
        }
        for retired in self.disposal.take_due(now) {
            release(backend, retired);
        }
    }

    fn retire_live(&mut self, now: Duration, delay: Duration) {
        if let Some(live) = self.live.take() {
            self.disposal.schedule(Retired::Textures(live), now, delay);
        }
        if let Some(material) = self.material.take() {
            self.disposal.schedule(Retired::Material(material), now, delay);
        }
    }

    fn start_tier(&mut self, tier: usize, now: Duration) {
        let resolution = self.settings.tiers.resolution(tier);

        let buffers = match prepare_base(&self.reference, resolution, &self.gradient) {
            Ok(buffers) => buffers,
            Err(e) => return self.halt(&e),
        };

        let request = SynthesisRequest {
            generation: self.generation,
            tier,
            seed: self.seed,
            config: self.config.clone(),
            buffers,
        };

        match self.channel.submit(request) {
            Ok(()) => {
                debug!(
                    "{}: tier {tier} ({resolution}px) submitted at {:.2}s",
                    self.label,
                    now.as_secs_f32()
                );
                self.state = PipelineState::Synthesizing { tier, resolution };
            }
            Err(e) => self.halt(&e),
        }
    }

    fn handle_response<B>(&mut self, response: SynthesisResponse, backend: &mut B, now: Duration)
    where
        B: RenderBackend<Texture = T, Material = M>,
    {
        let expected = match self.state {
            PipelineState::Synthesizing { tier, .. } => Some(tier),
            _ => None,
        };
        if response.generation != self.generation || expected != Some(response.tier) {
            debug!(
                "{}: discarding stale tier {} result (generation {}, current {})",
                self.label, response.tier, response.generation, self.generation
            );
            return;
        }

        let tier = response.tier;
        let committed = response
            .result
            .and_then(|buffers| self.commit(tier, buffers, backend, now));

        match committed {
            Ok(()) if self.settings.tiers.is_final(tier) => {
                self.state = PipelineState::Settled {
                    resolution: self.settings.tiers.resolution(tier),
                };
                info!("{}: settled", self.label);
            }
            Ok(()) => {}
            Err(e) => self.halt(&e),
        }
    }

    fn commit<B>(
        &mut self,
        tier: usize,
        buffers: SurfaceBuffers,
        backend: &mut B,
        now: Duration,
    ) -> Result<(), TextureError>
    where
        B: RenderBackend<Texture = T, Material = M>,
    {
        let resolution = self.settings.tiers.resolution(tier);
        buffers.check_resolution(resolution)?;
        let material = self.material.as_ref().ok_or(TextureError::Disposed)?;

        let previous_normal = self.live.as_ref().map(|set| &set.maps.normal);
        let normal = derive_normal_map(&buffers.height, resolution, previous_normal)?;

        let SurfaceBuffers {
            height,
            specular,
            diffuse,
        } = buffers;
        let maps = SurfaceMaps {
            height,
            specular,
            diffuse,
            normal,
        };

        let textures = TierTextures {
            height: backend.upload(TextureKind::Height, &maps.height),
            specular: backend.upload(TextureKind::Specular, &maps.specular),
            diffuse: backend.upload(TextureKind::Diffuse, &maps.diffuse),
            normal: backend.upload(TextureKind::Normal, &maps.normal),
        };

        backend.bind(
            material,
            MaterialSlots {
                diffuse: &textures.diffuse,
                specular: &textures.specular,
                normal: &textures.normal,
                bump_level: bump_level(tier, self.options.roughness),
            },
        );

        let set = TextureSet {
            tier,
            resolution,
            maps,
            textures,
        };
        if let Some(superseded) = self.live.replace(set) {
            self.disposal
                .schedule(Retired::Textures(superseded), now, self.settings.grace);
        }

        self.state = PipelineState::Committed { tier, resolution };
        info!("{}: committed {resolution}px textures", self.label);
        Ok(())
    }

    fn halt(&mut self, e: &TextureError) {
        let last_committed = self.live.as_ref().map(|set| set.resolution);
        error!(
            "{}: texture refinement stopped: {e} (keeping {:?})",
            self.label, last_committed
        );
        self.state = PipelineState::Halted { last_committed };
    }
}

fn release<B: RenderBackend>(backend: &mut B, retired: Retired<B::Texture, B::Material>) {
    match retired {
        Retired::Textures(set) => {
            for texture in set.textures.into_array() {
                backend.release_texture(texture);
            }
        }
        Retired::Material(material) => backend.release_material(material),
    }
}
