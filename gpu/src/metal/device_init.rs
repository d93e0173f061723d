//! Metal device lookup

use objc2::rc::Retained;
use objc2::runtime::ProtocolObject;
use objc2_metal::{MTLCreateSystemDefaultDevice, MTLDevice};

// MTLCreateSystemDefaultDevice requires CoreGraphics to be linked
#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {}

/// Retained `MTLDevice`. Two handles are the same device when they point at
/// the same Objective-C object.
pub type MetalDevice = Retained<ProtocolObject<dyn MTLDevice>>;

/// The system default Metal device, if there is one.
pub fn system_default_device() -> Option<MetalDevice> {
    MTLCreateSystemDefaultDevice()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::metal::Metal;

    #[test]
    fn test_default_device_identity() {
        let Some(device) = system_default_device() else {
            println!("Metal not available, skipping");
            return;
        };
        let again = device.clone();
        assert!(Metal::same_device(&device, &again));
        println!("Metal device: {}", Metal::describe_device(&device));
    }
}
