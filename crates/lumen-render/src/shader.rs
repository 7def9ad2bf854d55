//! Embedded WGSL sources and a cache of compiled modules.

use std::collections::HashMap;

use log::debug;
use thiserror::Error;

pub const POST_SHADER: &str = "post";
pub const SCENE_SHADER: &str = "scene";
pub const SKY_SHADER: &str = "sky";

/// Every shader the renderer ships, by name.
pub const BUILTIN_SHADERS: [(&str, &str); 3] = [
    (POST_SHADER, include_str!("shaders/post.wgsl")),
    (SCENE_SHADER, include_str!("shaders/scene.wgsl")),
    (SKY_SHADER, include_str!("shaders/sky.wgsl")),
];

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("shader '{0}' is not a built-in shader")]
    Unknown(String),
}

/// Compiles each shader once per device.
#[derive(Default)]
pub struct ShaderLibrary {
    modules: HashMap<&'static str, wgpu::ShaderModule>,
}

impl ShaderLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The compiled module for a built-in shader, compiling it on first use.
    pub fn get(
        &mut self,
        device: &wgpu::Device,
        name: &str,
    ) -> Result<wgpu::ShaderModule, ShaderError> {
        let &(key, source) = BUILTIN_SHADERS
            .iter()
            .find(|(n, _)| *n == name)
            .ok_or_else(|| ShaderError::Unknown(name.to_string()))?;

        let module = self.modules.entry(key).or_insert_with(|| {
            debug!("Compiling shader '{key}'");
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(key),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        });
        Ok(module.clone())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fullscreen::ShaderStage;
    use crate::gpu::create_test_device_queue;

    fn source(name: &str) -> &'static str {
        BUILTIN_SHADERS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, s)| *s)
            .unwrap()
    }

    #[test]
    fn test_post_shader_has_every_stage_entry_point() {
        let post = source(POST_SHADER);
        assert!(post.contains("fn vs_fullscreen("));
        for stage in ShaderStage::ALL {
            assert!(
                post.contains(&format!("fn {}(", stage.entry_point())),
                "missing {}",
                stage.entry_point()
            );
        }
    }

    #[test]
    fn test_post_shader_weights_match_cpu() {
        let post = source(POST_SHADER);
        for w in crate::fullscreen::GAUSSIAN_WEIGHTS {
            let text = format!("{w}");
            assert!(post.contains(&text[..text.len().min(8)]), "{text}");
        }
    }

    #[test]
    fn test_unknown_shader_is_an_error() {
        let Some((device, _queue)) = create_test_device_queue() else {
            return;
        };
        let mut library = ShaderLibrary::new();
        assert!(matches!(
            library.get(&device, "missing"),
            Err(ShaderError::Unknown(_))
        ));
    }

    #[test]
    fn test_modules_are_cached() {
        let Some((device, _queue)) = create_test_device_queue() else {
            return;
        };
        let mut library = ShaderLibrary::new();
        for (name, _) in BUILTIN_SHADERS {
            library.get(&device, name).unwrap();
            library.get(&device, name).unwrap();
        }
        assert_eq!(library.len(), BUILTIN_SHADERS.len());
    }
}
