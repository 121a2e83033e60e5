// src/texture.rs
//! Texture usages and shared texture references.
//!
//! A sampler is identified by what each of its (up to four) channels holds, e.g. an
//! ORM map is `{Occlusion, Roughness, Metallic}`. Trailing `Unused` channels do not
//! change identity; leading ones do.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::gpu::TextureHandle;
use crate::hash::{hash, HashValue};

/// What a texture channel is used for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum MaterialTextureUsage {
    #[default]
    Unused = 0,
    BaseColor,
    Normal,
    Emissive,
    Occlusion,
    Roughness,
    Metallic,
    Ambient,
    Bump,
    Diffuse,
    DiffuseEnvironment,
    Gloss,
    Height,
    Light,
    Opacity,
    Reflection,
    Shadow,
    Shininess,
    Specular,
    SpecularEnvironment,
    BrdfLookupTable,
}

impl MaterialTextureUsage {
    pub const ALL: [MaterialTextureUsage; 21] = [
        MaterialTextureUsage::Unused,
        MaterialTextureUsage::BaseColor,
        MaterialTextureUsage::Normal,
        MaterialTextureUsage::Emissive,
        MaterialTextureUsage::Occlusion,
        MaterialTextureUsage::Roughness,
        MaterialTextureUsage::Metallic,
        MaterialTextureUsage::Ambient,
        MaterialTextureUsage::Bump,
        MaterialTextureUsage::Diffuse,
        MaterialTextureUsage::DiffuseEnvironment,
        MaterialTextureUsage::Gloss,
        MaterialTextureUsage::Height,
        MaterialTextureUsage::Light,
        MaterialTextureUsage::Opacity,
        MaterialTextureUsage::Reflection,
        MaterialTextureUsage::Shadow,
        MaterialTextureUsage::Shininess,
        MaterialTextureUsage::Specular,
        MaterialTextureUsage::SpecularEnvironment,
        MaterialTextureUsage::BrdfLookupTable,
    ];

    pub fn from_raw(raw: u8) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    pub const fn name(self) -> &'static str {
        match self {
            MaterialTextureUsage::Unused => "Unused",
            MaterialTextureUsage::BaseColor => "BaseColor",
            MaterialTextureUsage::Normal => "Normal",
            MaterialTextureUsage::Emissive => "Emissive",
            MaterialTextureUsage::Occlusion => "Occlusion",
            MaterialTextureUsage::Roughness => "Roughness",
            MaterialTextureUsage::Metallic => "Metallic",
            MaterialTextureUsage::Ambient => "Ambient",
            MaterialTextureUsage::Bump => "Bump",
            MaterialTextureUsage::Diffuse => "Diffuse",
            MaterialTextureUsage::DiffuseEnvironment => "DiffuseEnvironment",
            MaterialTextureUsage::Gloss => "Gloss",
            MaterialTextureUsage::Height => "Height",
            MaterialTextureUsage::Light => "Light",
            MaterialTextureUsage::Opacity => "Opacity",
            MaterialTextureUsage::Reflection => "Reflection",
            MaterialTextureUsage::Shadow => "Shadow",
            MaterialTextureUsage::Shininess => "Shininess",
            MaterialTextureUsage::Specular => "Specular",
            MaterialTextureUsage::SpecularEnvironment => "SpecularEnvironment",
            MaterialTextureUsage::BrdfLookupTable => "BrdfLookupTable",
        }
    }
}

impl FromStr for MaterialTextureUsage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|usage| usage.name() == s)
            .ok_or_else(|| Error::UnknownTextureUsage(s.to_string()))
    }
}

/// Channel usages of one texture, used as the texture's key in a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TextureUsageInfo {
    channels: [MaterialTextureUsage; TextureUsageInfo::MAX_CHANNELS],
}

impl TextureUsageInfo {
    pub const MAX_CHANNELS: usize = 4;

    /// Builds from per-channel usages. Entries past the fourth are dropped with a warning.
    pub fn new(usages: &[MaterialTextureUsage]) -> Self {
        if usages.len() > Self::MAX_CHANNELS {
            log::warn!("{}", Error::TextureChannelOverflow(usages.len()));
        }
        let mut channels = [MaterialTextureUsage::Unused; Self::MAX_CHANNELS];
        for (slot, usage) in channels.iter_mut().zip(usages) {
            *slot = *usage;
        }
        Self { channels }
    }

    /// Builds from raw enum values. Unknown values become `Unused`.
    pub fn from_raw_channels(raw: &[u8]) -> Self {
        let usages: Vec<_> = raw
            .iter()
            .map(|&value| {
                MaterialTextureUsage::from_raw(value).unwrap_or_else(|| {
                    crate::dfatal!("Invalid texture usage value: {}", value);
                    MaterialTextureUsage::Unused
                })
            })
            .collect();
        Self::new(&usages)
    }

    /// Usage of channel `index`; `Unused` past the last channel.
    #[inline]
    pub fn channel_usage(&self, index: usize) -> MaterialTextureUsage {
        self.channels
            .get(index)
            .copied()
            .unwrap_or(MaterialTextureUsage::Unused)
    }

    #[inline]
    pub fn channels(&self) -> &[MaterialTextureUsage; Self::MAX_CHANNELS] {
        &self.channels
    }

    /// Channels up to and including the last used one.
    pub fn used_channels(&self) -> &[MaterialTextureUsage] {
        let len = self
            .channels
            .iter()
            .rposition(|&usage| usage != MaterialTextureUsage::Unused)
            .map_or(0, |index| index + 1);
        &self.channels[..len]
    }

    /// Whether only channel 0 carries a usage.
    pub fn is_single_usage(&self) -> bool {
        self.used_channels().len() <= 1
    }

    /// Hash of `"Texture_"` followed by each channel name up to the last used channel.
    /// A texture with no used channel hashes as `"Texture_Unused"`.
    /// Matches the environment flag the asset pipeline attaches to sampler snippets.
    pub fn hash(&self) -> HashValue {
        hash(&self.to_string())
    }
}

impl From<MaterialTextureUsage> for TextureUsageInfo {
    fn from(usage: MaterialTextureUsage) -> Self {
        Self::new(&[usage])
    }
}

impl fmt::Display for TextureUsageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Texture_")?;
        let used = self.used_channels();
        if used.is_empty() {
            return f.write_str(MaterialTextureUsage::Unused.name());
        }
        for usage in used {
            f.write_str(usage.name())?;
        }
        Ok(())
    }
}

/// A texture owned by the external texture cache. Materials only hold `Arc`s to it.
#[derive(Debug)]
pub struct Texture {
    name: String,
    handle: TextureHandle,
    loaded: AtomicBool,
}

impl Texture {
    pub fn new(name: impl Into<String>, handle: TextureHandle) -> Self {
        Self {
            name: name.into(),
            handle,
            loaded: AtomicBool::new(false),
        }
    }

    /// A texture whose data is already resident.
    pub fn loaded(name: impl Into<String>, handle: TextureHandle) -> Self {
        let texture = Self::new(name, handle);
        texture.mark_loaded();
        texture
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub fn mark_loaded(&self) {
        self.loaded.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MaterialTextureUsage::*;

    #[test]
    fn test_hash_is_stable_and_order_sensitive() {
        let rm = TextureUsageInfo::new(&[Unused, Roughness, Metallic]);
        let again = TextureUsageInfo::new(&[Unused, Roughness, Metallic]);
        let orm = TextureUsageInfo::new(&[Occlusion, Roughness, Metallic]);

        assert_eq!(rm.hash(), again.hash());
        assert_ne!(rm.hash(), orm.hash());
        assert_eq!(rm.to_string(), "Texture_UnusedRoughnessMetallic");
        assert_eq!(rm.hash(), hash("Texture_UnusedRoughnessMetallic"));
    }

    #[test]
    fn test_trailing_unused_is_insignificant() {
        let short = TextureUsageInfo::from(BaseColor);
        let padded = TextureUsageInfo::new(&[BaseColor, Unused, Unused]);
        assert_eq!(short, padded);
        assert_eq!(short.hash(), hash("Texture_BaseColor"));
        assert!(short.is_single_usage());
    }

    #[test]
    fn test_all_unused_keeps_one_channel_name() {
        let none = TextureUsageInfo::default();
        assert_eq!(none.to_string(), "Texture_Unused");
        assert_eq!(none.hash(), hash("Texture_Unused"));
        assert_eq!(TextureUsageInfo::new(&[Unused, Unused]).hash(), none.hash());
        assert!(none.used_channels().is_empty());
    }

    #[test]
    fn test_channel_usage_past_end() {
        let info = TextureUsageInfo::new(&[Occlusion, Roughness]);
        assert_eq!(info.channel_usage(1), Roughness);
        assert_eq!(info.channel_usage(3), Unused);
        assert_eq!(info.channel_usage(9), Unused);
        assert!(!info.is_single_usage());
    }

    #[test]
    fn test_too_many_channels_truncates() {
        let info = TextureUsageInfo::new(&[BaseColor, Normal, Emissive, Occlusion, Metallic]);
        assert_eq!(info.used_channels(), &[BaseColor, Normal, Emissive, Occlusion]);
    }

    #[cfg(not(feature = "strict-dfatal"))]
    #[test]
    fn test_invalid_raw_channel_ignored() {
        let info = TextureUsageInfo::from_raw_channels(&[1, 250]);
        assert_eq!(info, TextureUsageInfo::from(BaseColor));
    }

    #[test]
    fn test_usage_names_parse() {
        assert_eq!("BrdfLookupTable".parse::<MaterialTextureUsage>().unwrap(), BrdfLookupTable);
        assert!(matches!(
            "Sparkle".parse::<MaterialTextureUsage>(),
            Err(Error::UnknownTextureUsage(_))
        ));
        for usage in MaterialTextureUsage::ALL {
            assert_eq!(usage.name().parse::<MaterialTextureUsage>().unwrap(), usage);
        }
    }

    #[test]
    fn test_texture_loaded_flag() {
        let texture = Texture::new("brick", TextureHandle(3));
        assert!(!texture.is_loaded());
        texture.mark_loaded();
        assert!(texture.is_loaded());
        assert_eq!(texture.handle(), TextureHandle(3));
    }
}
