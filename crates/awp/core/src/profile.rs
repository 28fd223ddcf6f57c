//! Personalization profile
//!
//! A profile maps symbolic file names to [`FileDescriptor`] templates and PIN
//! roles to retry policies. [`StaticProfile`] is a plain in-memory profile that
//! can be loaded from configuration; [`StaticProfile::oberthur_default`] holds
//! the stock AWP layout.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::file::{Acl, AclMethod, AclOperation, EfStructure, FileDescriptor, FileType};
use crate::path::Path;
use crate::pin::{PinPolicy, PinRole};

/// Well-known profile file names
pub mod names {
    /// Card-global application directory
    pub const DIR: &str = "DIR";
    /// Default PKCS#15 application DF, the DF-info root
    pub const PKCS15_APP_DF: &str = "PKCS15-AppDF";
    /// AWP application DF
    pub const APP_DF: &str = "OberthurAWP-AppDF";
    /// DF holding private objects
    pub const PRIVATE_DF: &str = "private-DF";
    /// DF holding public objects
    pub const PUBLIC_DF: &str = "public-DF";
    /// TokenInfo record
    pub const TOKEN_INFO: &str = "OberthurAWP-token-info";
    /// Recovery PUK file
    pub const PUK_FILE: &str = "OberthurAWP-puk-file";
    /// Key container list
    pub const CONTAINER_LIST: &str = "OberthurAWP-container-list";
    /// Public object list
    pub const PUBLIC_LIST: &str = "OberthurAWP-public-list";
    /// Private object list
    pub const PRIVATE_LIST: &str = "OberthurAWP-private-list";

    /// Private key file template
    pub const TEMPLATE_PRIVATE_KEY: &str = "template-private-key";
    /// Public key file template
    pub const TEMPLATE_PUBLIC_KEY: &str = "template-public-key";
    /// Certificate file template
    pub const TEMPLATE_CERTIFICATE: &str = "template-certificate";
    /// Public data object template
    pub const TEMPLATE_PUBLIC_DATA: &str = "template-public-data";
}

/// Source of file templates and PIN policies
pub trait Profile: fmt::Debug {
    /// Resolve a file template by name
    fn file(&self, name: &str) -> Option<FileDescriptor>;

    /// Retry policy of a PIN role
    fn pin_policy(&self, role: PinRole) -> Option<PinPolicy>;

    /// Token label configured in the profile
    fn label(&self) -> Option<&str>;

    /// Root of the PKCS#15 DF-info structure
    fn df_info(&self) -> Option<FileDescriptor>;
}

/// Profile held entirely in memory
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StaticProfile {
    /// Token label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Name of the file holding the DF-info root
    #[serde(default = "default_df_info")]
    pub df_info: String,
    /// File templates by name
    #[serde(default)]
    pub files: BTreeMap<String, FileDescriptor>,
    /// PIN policies by role
    #[serde(default)]
    pub pins: BTreeMap<PinRole, PinPolicy>,
}

fn default_df_info() -> String {
    names::PKCS15_APP_DF.to_string()
}

fn path(hex: &str) -> Path {
    // Only called with the literals below
    Path::from_hex(hex).unwrap_or_default()
}

impl StaticProfile {
    /// Empty profile
    pub fn new() -> Self {
        Self {
            df_info: default_df_info(),
            ..Self::default()
        }
    }

    /// Builder-style label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Builder-style file template
    pub fn with_file(mut self, name: impl Into<String>, file: FileDescriptor) -> Self {
        self.files.insert(name.into(), file);
        self
    }

    /// Builder-style PIN policy
    pub fn with_pin(mut self, role: PinRole, policy: PinPolicy) -> Self {
        self.pins.insert(role, policy);
        self
    }

    /// Remove a file template, returning it
    pub fn remove_file(&mut self, name: &str) -> Option<FileDescriptor> {
        self.files.remove(name)
    }

    /// The stock Oberthur AWP layout
    ///
    /// ```text
    /// 3F00
    /// ├── 2F00  DIR
    /// ├── 5015  PKCS15-AppDF
    /// └── 5011  OberthurAWP-AppDF
    ///     ├── 1000  token-info
    ///     ├── 2000  puk-file
    ///     ├── 3000  container-list
    ///     ├── 4000  public-list
    ///     ├── 5000  private-list
    ///     ├── 9001  public-DF   (template-public-key A0xx, certificate 20xx, data 60xx)
    ///     └── 9002  private-DF  (template-private-key 30xx)
    /// ```
    pub fn oberthur_default() -> Self {
        let user = AclMethod::Chv(0x81);
        let so = AclMethod::Chv(0x04);

        let df_acl = Acl::new()
            .with(AclOperation::Create, so)
            .with(AclOperation::Delete, so)
            .with(AclOperation::Crypto, AclMethod::None);
        let user_df_acl = Acl::new()
            .with(AclOperation::Create, user)
            .with(AclOperation::Delete, user)
            .with(AclOperation::Crypto, user);
        let public_ef_acl = Acl::new()
            .with(AclOperation::Read, AclMethod::None)
            .with(AclOperation::Update, user)
            .with(AclOperation::Delete, user);
        let private_ef_acl = Acl::new()
            .with(AclOperation::Read, user)
            .with(AclOperation::Update, user)
            .with(AclOperation::Delete, user);

        let df = |hex: &str| FileDescriptor::new(path(hex), FileType::Df, 0);
        let ef = |hex: &str, size: usize| FileDescriptor::new(path(hex), FileType::WorkingEf, size);
        let internal = |hex: &str, size: usize| {
            FileDescriptor::new(path(hex), FileType::InternalEf, size)
        };

        Self::new()
            .with_label("Oberthur AWP")
            .with_file(
                names::DIR,
                ef("3F002F00", 128).with_acl(public_ef_acl.clone()),
            )
            .with_file(names::PKCS15_APP_DF, df("3F005015").with_acl(df_acl.clone()))
            .with_file(names::APP_DF, df("3F005011").with_acl(df_acl))
            .with_file(names::PRIVATE_DF, df("3F0050119002").with_acl(user_df_acl.clone()))
            .with_file(names::PUBLIC_DF, df("3F0050119001").with_acl(user_df_acl))
            .with_file(
                names::TOKEN_INFO,
                ef("3F0050111000", 36)
                    .with_structure(EfStructure::Transparent)
                    .with_acl(public_ef_acl.clone()),
            )
            .with_file(
                names::PUK_FILE,
                ef("3F0050112000", 16)
                    .with_structure(EfStructure::Transparent)
                    .with_acl(private_ef_acl.clone()),
            )
            .with_file(
                names::CONTAINER_LIST,
                ef("3F0050113000", 256).with_acl(public_ef_acl.clone()),
            )
            .with_file(
                names::PUBLIC_LIST,
                ef("3F0050114000", 256).with_acl(public_ef_acl.clone()),
            )
            .with_file(
                names::PRIVATE_LIST,
                ef("3F0050115000", 256).with_acl(private_ef_acl),
            )
            .with_file(
                names::TEMPLATE_PRIVATE_KEY,
                internal("3F00501190023000", 1024).with_acl(
                    Acl::new()
                        .with(AclOperation::Update, user)
                        .with(AclOperation::Delete, user)
                        .with(AclOperation::PsoDecrypt, user)
                        .with(AclOperation::PsoComputeSignature, user)
                        .with(AclOperation::InternalAuthenticate, user),
                ),
            )
            .with_file(
                names::TEMPLATE_PUBLIC_KEY,
                internal("3F0050119001A000", 1024).with_acl(
                    Acl::new()
                        .with(AclOperation::Update, user)
                        .with(AclOperation::Delete, user)
                        .with(AclOperation::PsoEncrypt, AclMethod::None)
                        .with(AclOperation::PsoVerifySignature, AclMethod::None),
                ),
            )
            .with_file(
                names::TEMPLATE_CERTIFICATE,
                ef("3F00501190012000", 2048).with_acl(public_ef_acl.clone()),
            )
            .with_file(
                names::TEMPLATE_PUBLIC_DATA,
                ef("3F00501190016000", 1024).with_acl(public_ef_acl),
            )
            .with_pin(PinRole::SoPin, PinPolicy::new(3))
            .with_pin(PinRole::SoPuk, PinPolicy::new(3))
            .with_pin(PinRole::UserPin, PinPolicy::new(5))
            .with_pin(PinRole::UserPuk, PinPolicy::new(5))
    }
}

impl Profile for StaticProfile {
    fn file(&self, name: &str) -> Option<FileDescriptor> {
        self.files.get(name).cloned()
    }

    fn pin_policy(&self, role: PinRole) -> Option<PinPolicy> {
        self.pins.get(&role).copied()
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn df_info(&self) -> Option<FileDescriptor> {
        self.file(&self.df_info)
    }
}
