use awp_core::FileId;

/// PIN reference of the security officer PIN and of unblocking PINs
pub const SO_PIN_REFERENCE: u8 = 0x04;
/// Default user PIN reference
pub const USER_PIN_DEFAULT_REFERENCE: u8 = 0x01;
/// Bit added to the reference of PINs local to the application DF
pub const LOCAL_PIN_BIT: u8 = 0x80;
/// Reference a user PIN must carry when it is created
pub const USER_PIN_REFERENCE: u8 = 0x81;
/// Reference a user PUK must carry when it is created
pub const USER_PUK_REFERENCE: u8 = 0x84;

/// Maximum PIN length in bytes
pub const MAX_PIN_LENGTH: usize = 0x40;

/// Recovery PUK attached to every user PIN whose PUK policy allows retries
///
/// The value is shared by every card personalized with this driver.
pub const RECOVERY_PUK: [u8; 16] = [
    0x6F, 0x47, 0xD9, 0x88, 0x4B, 0x6F, 0x9D, 0xC5, 0x78, 0x33, 0x79, 0x8F, 0x5B, 0x7D, 0xE1, 0xA5,
];
/// Attempts allowed for the recovery PUK
pub const RECOVERY_PUK_TRIES: u8 = 5;

/// Identifier of the scratch public key file used during key generation
pub const TEMP_PUBLIC_KEY_ID: FileId = FileId::new(0x1012);
/// Public exponent of generated RSA keys
pub const RSA_EXPONENT: u32 = 0x10001;

/// Size of the object id field of an update-key request
pub const MAX_KEY_ID_LENGTH: usize = 0xFF;

/// Files created below the root DF, in creation order
pub const DIRECTORY_LAYOUT: [&str; 8] = [
    awp_core::profile::names::APP_DF,
    awp_core::profile::names::PRIVATE_DF,
    awp_core::profile::names::PUBLIC_DF,
    awp_core::profile::names::TOKEN_INFO,
    awp_core::profile::names::PUK_FILE,
    awp_core::profile::names::CONTAINER_LIST,
    awp_core::profile::names::PUBLIC_LIST,
    awp_core::profile::names::PRIVATE_LIST,
];
