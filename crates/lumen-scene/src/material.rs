//! Surface appearance: tint, roughness and named texture/sampler bindings.

use std::collections::BTreeMap;

use glam::Vec4;

use crate::handle::TextureHandle;

/// Sampler state a material asks for. The backend owns the actual samplers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SamplerKind {
    /// Trilinear filtering, repeat addressing.
    #[default]
    LinearWrap,
    /// Linear filtering, clamp-to-edge addressing.
    LinearClamp,
    /// Nearest filtering, repeat addressing.
    NearestWrap,
}

/// How an entity's surface looks.
///
/// Bindings are keyed by shader slot name. A `BTreeMap` keeps iteration order
/// stable so bind groups come out identical from frame to frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Multiplied with the albedo. Values above 1 make the surface glow.
    pub color_tint: Vec4,
    pub roughness: f32,
    textures: BTreeMap<String, TextureHandle>,
    samplers: BTreeMap<String, SamplerKind>,
}

impl Material {
    #[must_use]
    pub fn new(color_tint: Vec4, roughness: f32) -> Self {
        Self {
            color_tint,
            roughness,
            textures: BTreeMap::new(),
            samplers: BTreeMap::new(),
        }
    }

    /// Bind `texture` to the shader slot `name`, replacing any previous binding.
    pub fn add_texture(&mut self, name: impl Into<String>, texture: TextureHandle) {
        self.textures.insert(name.into(), texture);
    }

    /// Bind a sampler kind to the shader slot `name`.
    pub fn add_sampler(&mut self, name: impl Into<String>, sampler: SamplerKind) {
        self.samplers.insert(name.into(), sampler);
    }

    #[must_use]
    pub fn with_texture(mut self, name: impl Into<String>, texture: TextureHandle) -> Self {
        self.add_texture(name, texture);
        self
    }

    #[must_use]
    pub fn with_sampler(mut self, name: impl Into<String>, sampler: SamplerKind) -> Self {
        self.add_sampler(name, sampler);
        self
    }

    pub fn texture(&self, name: &str) -> Option<TextureHandle> {
        self.textures.get(name).copied()
    }

    pub fn sampler(&self, name: &str) -> Option<SamplerKind> {
        self.samplers.get(name).copied()
    }

    pub fn textures(&self) -> impl Iterator<Item = (&str, TextureHandle)> {
        self.textures.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn samplers(&self) -> impl Iterator<Item = (&str, SamplerKind)> {
        self.samplers.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
