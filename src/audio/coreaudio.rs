use core_foundation::base::TCFType;
use core_foundation::string::{CFString, CFStringRef};
use coreaudio_sys::*;
use std::os::raw::c_void;
use std::ptr;
use tracing::{debug, error, info, warn};

use super::device::{AudioObjectId, OutputDeviceHandle, OutputRole, UNKNOWN_DEVICE};
use super::directory::{
    AudioDeviceDirectory, HardwareCallback, ListenerHost, ListenerKind, ListenerSubscription,
    find_output_by_name, retarget_output_roles,
};
use crate::error::GluedError;

const NO_ERROR: OSStatus = kAudioHardwareNoError as OSStatus;

fn global_address(selector: AudioObjectPropertySelector) -> AudioObjectPropertyAddress {
    AudioObjectPropertyAddress {
        mSelector: selector,
        mScope: kAudioObjectPropertyScopeGlobal,
        mElement: kAudioObjectPropertyElementMain,
    }
}

/// CoreAudio implementation of the audio directory and listener host.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoreAudioDirectory;

impl CoreAudioDirectory {
    pub fn new() -> Self {
        info!("Initialized CoreAudio device directory");
        Self
    }

    fn all_device_ids(&self) -> Result<Vec<AudioDeviceID>, GluedError> {
        let property_address = global_address(kAudioHardwarePropertyDevices);

        unsafe {
            let mut property_size: u32 = 0;
            let status = AudioObjectGetPropertyDataSize(
                kAudioObjectSystemObject,
                &property_address,
                0,
                ptr::null(),
                &mut property_size,
            );
            if status != NO_ERROR {
                return Err(GluedError::HardwareQuery {
                    what: "device list size",
                    status,
                });
            }

            let device_count = property_size as usize / std::mem::size_of::<AudioDeviceID>();
            let mut devices: Vec<AudioDeviceID> = vec![0; device_count];

            let status = AudioObjectGetPropertyData(
                kAudioObjectSystemObject,
                &property_address,
                0,
                ptr::null(),
                &mut property_size,
                devices.as_mut_ptr() as *mut c_void,
            );
            if status != NO_ERROR {
                return Err(GluedError::HardwareQuery {
                    what: "device list",
                    status,
                });
            }

            // The list can shrink between the two calls
            devices.truncate(property_size as usize / std::mem::size_of::<AudioDeviceID>());
            Ok(devices)
        }
    }

    fn has_output_streams(&self, device_id: AudioDeviceID) -> bool {
        let property_address = AudioObjectPropertyAddress {
            mSelector: kAudioDevicePropertyStreams,
            mScope: kAudioDevicePropertyScopeOutput,
            mElement: kAudioObjectPropertyElementMain,
        };

        let mut property_size: u32 = 0;
        let status = unsafe {
            AudioObjectGetPropertyDataSize(
                device_id,
                &property_address,
                0,
                ptr::null(),
                &mut property_size,
            )
        };

        status == NO_ERROR && property_size > 0
    }

    fn set_role(&self, device_id: AudioDeviceID, role: OutputRole) -> Result<(), GluedError> {
        let selector = match role {
            OutputRole::DefaultOutput => kAudioHardwarePropertyDefaultOutputDevice,
            OutputRole::SystemOutput => kAudioHardwarePropertyDefaultSystemOutputDevice,
        };
        let property_address = global_address(selector);

        let status = unsafe {
            AudioObjectSetPropertyData(
                kAudioObjectSystemObject,
                &property_address,
                0,
                ptr::null(),
                std::mem::size_of::<AudioDeviceID>() as u32,
                &device_id as *const _ as *const c_void,
            )
        };

        if status != NO_ERROR {
            error!("Failed to set {} to device {}: {}", role, device_id, status);
            return Err(GluedError::HardwareSet {
                role: role.as_str(),
                status,
            });
        }

        debug!("Set {} to device ID {}", role, device_id);
        Ok(())
    }

    fn add_listener(
        &self,
        object: AudioObjectID,
        selector: AudioObjectPropertySelector,
        kind: ListenerKind,
        callback: HardwareCallback,
    ) -> Result<ListenerSubscription, GluedError> {
        let registration = PropertyListenerRegistration {
            object,
            address: global_address(selector),
            client_data: Box::into_raw(Box::new(callback)) as *mut c_void,
        };

        let status = unsafe {
            AudioObjectAddPropertyListener(
                registration.object,
                &registration.address,
                Some(property_listener),
                registration.client_data,
            )
        };

        if status != NO_ERROR {
            // Never handed to CoreAudio, so reclaim without removing
            unsafe { drop(Box::from_raw(registration.client_data as *mut HardwareCallback)) };
            return Err(GluedError::ListenerRegistration {
                kind: match kind {
                    ListenerKind::DefaultOutput => "default output",
                    ListenerKind::IsRunning(_) => "is-running",
                },
                status,
            });
        }

        debug!("Registered CoreAudio listener: {}", kind);
        Ok(ListenerSubscription::new(kind, move || {
            registration.remove(kind)
        }))
    }
}

impl AudioDeviceDirectory for CoreAudioDirectory {
    fn current_default_output(&self) -> Result<OutputDeviceHandle, GluedError> {
        let property_address = global_address(kAudioHardwarePropertyDefaultOutputDevice);
        let mut device_id: AudioDeviceID = UNKNOWN_DEVICE;
        let mut property_size = std::mem::size_of::<AudioDeviceID>() as u32;

        let status = unsafe {
            AudioObjectGetPropertyData(
                kAudioObjectSystemObject,
                &property_address,
                0,
                ptr::null(),
                &mut property_size,
                &mut device_id as *mut _ as *mut c_void,
            )
        };

        if status != NO_ERROR {
            return Err(GluedError::HardwareQuery {
                what: "default output device",
                status,
            });
        }
        if device_id == UNKNOWN_DEVICE {
            return Err(GluedError::HardwareQuery {
                what: "default output device",
                status: kAudioHardwareBadObjectError as OSStatus,
            });
        }

        Ok(OutputDeviceHandle {
            id: device_id,
            name: self.name_of(device_id),
        })
    }

    fn name_of(&self, device: AudioObjectId) -> Option<String> {
        if device == UNKNOWN_DEVICE {
            return None;
        }

        let property_address = global_address(kAudioDevicePropertyDeviceNameCFString);
        let mut property_size = std::mem::size_of::<CFStringRef>() as u32;
        let mut cf_string: CFStringRef = ptr::null();

        let status = unsafe {
            AudioObjectGetPropertyData(
                device,
                &property_address,
                0,
                ptr::null(),
                &mut property_size,
                &mut cf_string as *mut _ as *mut c_void,
            )
        };

        if status != NO_ERROR || cf_string.is_null() {
            return None;
        }

        // The property hands out a retained string
        let cf_string = unsafe { CFString::wrap_under_create_rule(cf_string) };
        Some(cf_string.to_string())
    }

    fn list_output_devices(&self) -> Result<Vec<OutputDeviceHandle>, GluedError> {
        let devices: Vec<OutputDeviceHandle> = self
            .all_device_ids()?
            .into_iter()
            .filter(|&id| self.has_output_streams(id))
            .map(|id| OutputDeviceHandle {
                id,
                name: self.name_of(id),
            })
            .collect();

        debug!("Enumerated {} output devices", devices.len());
        Ok(devices)
    }

    fn set_default_output(&self, name: &str) -> Result<(), GluedError> {
        info!("Setting default output device to: {}", name);

        let devices = self.list_output_devices()?;
        let device = find_output_by_name(&devices, name)?;
        retarget_output_roles(|role| self.set_role(device.id, role))?;

        info!("Switched default and system output to: {}", device);
        Ok(())
    }

    fn is_running_somewhere(&self, device: AudioObjectId) -> Result<bool, GluedError> {
        let property_address = global_address(kAudioDevicePropertyDeviceIsRunningSomewhere);
        let mut is_running: u32 = 0;
        let mut property_size = std::mem::size_of::<u32>() as u32;

        let status = unsafe {
            AudioObjectGetPropertyData(
                device,
                &property_address,
                0,
                ptr::null(),
                &mut property_size,
                &mut is_running as *mut _ as *mut c_void,
            )
        };

        if status != NO_ERROR {
            return Err(GluedError::HardwareQuery {
                what: "device is running somewhere",
                status,
            });
        }

        Ok(is_running != 0)
    }
}

impl ListenerHost for CoreAudioDirectory {
    fn watch_default_output(
        &self,
        callback: HardwareCallback,
    ) -> Result<ListenerSubscription, GluedError> {
        self.add_listener(
            kAudioObjectSystemObject,
            kAudioHardwarePropertyDefaultOutputDevice,
            ListenerKind::DefaultOutput,
            callback,
        )
    }

    fn watch_is_running(
        &self,
        device: AudioObjectId,
        callback: HardwareCallback,
    ) -> Result<ListenerSubscription, GluedError> {
        self.add_listener(
            device,
            kAudioDevicePropertyDeviceIsRunningSomewhere,
            ListenerKind::IsRunning(device),
            callback,
        )
    }
}

/// Everything needed to remove a listener registered with
/// `AudioObjectAddPropertyListener`. `client_data` owns a boxed
/// [`HardwareCallback`].
struct PropertyListenerRegistration {
    object: AudioObjectID,
    address: AudioObjectPropertyAddress,
    client_data: *mut c_void,
}

// The client data is only touched by CoreAudio and by `remove`
unsafe impl Send for PropertyListenerRegistration {}

impl PropertyListenerRegistration {
    fn remove(self, kind: ListenerKind) {
        unsafe {
            let status = AudioObjectRemovePropertyListener(
                self.object,
                &self.address,
                Some(property_listener),
                self.client_data,
            );

            if status != NO_ERROR {
                // CoreAudio may still call into the client data, so it is leaked
                warn!("Failed to remove {} listener: {}", kind, status);
                return;
            }

            debug!("Removed CoreAudio listener: {}", kind);
            drop(Box::from_raw(self.client_data as *mut HardwareCallback));
        }
    }
}

// CoreAudio callback trampoline shared by every listener
unsafe extern "C" fn property_listener(
    _in_object_id: AudioObjectID,
    _in_number_addresses: UInt32,
    _in_addresses: *const AudioObjectPropertyAddress,
    in_client_data: *mut c_void,
) -> OSStatus {
    if !in_client_data.is_null() {
        let callback = unsafe { &*(in_client_data as *const HardwareCallback) };
        callback();
    }
    NO_ERROR
}
