use crate::segmentation::ModelQuality;

/// Widest display still treated as a phone/tablet
pub const MOBILE_MAX_WIDTH: u32 = 768;

/// Coarse capability tier, fixed for the whole session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Mobile,
    Desktop,
}

impl DeviceClass {
    /// Derive the tier from the presentation surface size
    pub fn from_display(width: u32, _height: u32) -> Self {
        if width <= MOBILE_MAX_WIDTH {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }

    /// Mask erosion is only worth its cost on desktop-class hardware
    pub fn erodes_mask(self) -> bool {
        matches!(self, DeviceClass::Desktop)
    }

    pub fn model_quality(self) -> ModelQuality {
        match self {
            DeviceClass::Mobile => ModelQuality::Lightweight,
            DeviceClass::Desktop => ModelQuality::HighQuality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_displays_are_mobile() {
        assert_eq!(DeviceClass::from_display(375, 812), DeviceClass::Mobile);
        assert_eq!(DeviceClass::from_display(768, 1024), DeviceClass::Mobile);
        assert_eq!(DeviceClass::from_display(1280, 720), DeviceClass::Desktop);
    }

    #[test]
    fn policy_follows_class() {
        assert!(DeviceClass::Desktop.erodes_mask());
        assert!(!DeviceClass::Mobile.erodes_mask());
        assert_eq!(DeviceClass::Mobile.model_quality(), ModelQuality::Lightweight);
        assert_eq!(DeviceClass::Desktop.model_quality(), ModelQuality::HighQuality);
    }
}
