use std::collections::{BTreeMap, BTreeSet};

use awp_core::prelude::*;
use awp_core::{Algorithm, KeyId};
use bytes::Bytes;
use tracing::{debug, trace, warn};
use zeroize::Zeroizing;

use crate::journal::{Call, CallKind};
use crate::keygen;
use crate::snapshot::{CardSnapshot, FileEntry, KeyEntry, PinEntry};

#[derive(Debug, Clone)]
struct SimFile {
    descriptor: FileDescriptor,
    data: Vec<u8>,
}

/// A single queued failure
#[derive(Debug, Clone)]
pub struct Fault {
    kind: CallKind,
    error: Error,
}

impl Fault {
    /// Fail the next call of `kind` with `error`
    pub const fn new(kind: CallKind, error: Error) -> Self {
        Self { kind, error }
    }
}

/// PIN reference data held by the card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPin {
    /// DF the PIN was created in
    pub path: Option<Path>,
    /// PIN value
    pub value: Zeroizing<Vec<u8>>,
    /// Attempts allowed
    pub tries: u8,
    /// Attached PUK value and its attempts
    pub puk: Option<(Zeroizing<Vec<u8>>, u8)>,
}

/// Key material held in a key file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredKey {
    /// Algorithm
    pub algorithm: Algorithm,
    /// Modulus, for RSA keys
    pub modulus: Vec<u8>,
    /// PKCS#15 object id, for imported keys
    pub id: Option<KeyId>,
    /// Whether the key was generated on the card
    pub generated: bool,
}

/// In-memory AWP card
#[derive(Debug, Clone)]
pub struct SimulatedCard {
    serial: [u8; 8],
    files: BTreeMap<Path, SimFile>,
    selected: Option<Path>,
    granted: BTreeSet<(Path, AclOperation)>,
    pins: BTreeMap<u8, StoredPin>,
    keys: BTreeMap<Path, StoredKey>,
    journal: Vec<Call>,
    controls: Vec<ControlRequest>,
    faults: Vec<Fault>,
    resets: usize,
}

impl Default for SimulatedCard {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedCard {
    /// A blank card holding only the MF
    pub fn new() -> Self {
        Self::with_serial([0; 8])
    }

    /// A blank card whose generated keys derive from `serial`
    pub fn with_serial(serial: [u8; 8]) -> Self {
        let mf = Path::new(FileId::MF.to_bytes()).unwrap_or_default();
        let mut files = BTreeMap::new();
        files.insert(
            mf.clone(),
            SimFile {
                descriptor: FileDescriptor::new(mf, FileType::Df, 0),
                data: Vec::new(),
            },
        );
        Self {
            serial,
            files,
            selected: None,
            granted: BTreeSet::new(),
            pins: BTreeMap::new(),
            keys: BTreeMap::new(),
            journal: Vec::new(),
            controls: Vec::new(),
            faults: Vec::new(),
            resets: 0,
        }
    }

    /// Queue a fault
    pub fn inject(&mut self, fault: Fault) {
        self.faults.push(fault);
    }

    /// Fail the next call of `kind` with `error`
    pub fn fail_next(&mut self, kind: CallKind, error: Error) {
        self.inject(Fault::new(kind, error));
    }

    /// Whether a file exists at `path`
    pub fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    /// Descriptor of the file at `path`
    pub fn file(&self, path: &Path) -> Option<&FileDescriptor> {
        self.files.get(path).map(|file| &file.descriptor)
    }

    /// Content of the file at `path`
    pub fn file_data(&self, path: &Path) -> Option<&[u8]> {
        self.files.get(path).map(|file| file.data.as_slice())
    }

    /// Paths of all files, in tree order
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys()
    }

    /// Decode the TokenInfo record stored at `path`
    pub fn token_info(&self, path: &Path) -> Result<TokenInfo> {
        let data = self
            .file_data(path)
            .ok_or_else(|| Error::FileNotFound(path.clone()))?;
        TokenInfo::decode(data)
    }

    /// PIN reference data by reference
    pub fn pin(&self, reference: u8) -> Option<&StoredPin> {
        self.pins.get(&reference)
    }

    /// Key material in the key file at `path`
    pub fn key(&self, path: &Path) -> Option<&StoredKey> {
        self.keys.get(path)
    }

    /// Every call received so far
    pub fn journal(&self) -> &[Call] {
        &self.journal
    }

    /// Every control request received so far
    pub fn controls(&self) -> &[ControlRequest] {
        &self.controls
    }

    /// Number of application registry resets
    pub const fn resets(&self) -> usize {
        self.resets
    }

    /// Forget the journal and the recorded control requests
    pub fn clear_journal(&mut self) {
        self.journal.clear();
        self.controls.clear();
    }

    /// Serializable view of the card content
    pub fn snapshot(&self) -> CardSnapshot {
        CardSnapshot {
            files: self
                .files
                .values()
                .map(|file| FileEntry {
                    path: file.descriptor.path.clone(),
                    file_type: file.descriptor.file_type,
                    size: file.descriptor.size,
                    ef_structure: file.descriptor.ef_structure,
                    data: (!file.data.is_empty()).then(|| hex::encode(&file.data)),
                })
                .collect(),
            pins: self
                .pins
                .iter()
                .map(|(reference, pin)| PinEntry {
                    reference: *reference,
                    path: pin.path.clone(),
                    tries: pin.tries,
                    puk_tries: pin.puk.as_ref().map(|(_, tries)| *tries),
                })
                .collect(),
            keys: self
                .keys
                .iter()
                .map(|(path, key)| KeyEntry {
                    path: path.clone(),
                    algorithm: key.algorithm,
                    modulus_bits: key.modulus.len() * 8,
                    id: key.id.clone(),
                    generated: key.generated,
                })
                .collect(),
            resets: self.resets,
            calls: self.journal.len(),
        }
    }

    fn record(&mut self, call: Call) -> Result<()> {
        trace!(?call, "sim");
        let kind = call.kind();
        self.journal.push(call);
        match self.faults.iter().position(|fault| fault.kind == kind) {
            Some(index) => {
                let fault = self.faults.remove(index);
                warn!(?kind, error = %fault.error, "Injected fault");
                Err(fault.error)
            }
            None => Ok(()),
        }
    }

    fn lookup(&self, path: &Path) -> Result<&SimFile> {
        self.files
            .get(path)
            .ok_or_else(|| Error::FileNotFound(path.clone()))
    }

    /// Check the access condition of `operation` on the file at `path`
    fn check(&self, path: &Path, operation: AclOperation) -> Result<()> {
        let file = self.lookup(path)?;
        match file.descriptor.acl.get(operation) {
            None | Some(AclMethod::None) => Ok(()),
            Some(AclMethod::Chv(_)) if self.granted.contains(&(path.clone(), operation)) => Ok(()),
            Some(_) => Err(Error::SecurityStatusNotSatisfied {
                path: path.clone(),
                operation,
            }),
        }
    }

    /// DF the card resolves relative identifiers in
    fn current_df(&self) -> Result<Path> {
        let selected = self
            .selected
            .clone()
            .ok_or(Error::InvalidArguments("no file selected"))?;
        if self.lookup(&selected)?.descriptor.is_df() {
            Ok(selected)
        } else {
            selected
                .parent()
                .ok_or(Error::InvalidData("selected EF has no parent"))
        }
    }

    fn create_pin(
        &mut self,
        reference: u8,
        value: Zeroizing<Vec<u8>>,
        tries: u8,
        puk: Option<(Zeroizing<Vec<u8>>, u8)>,
    ) {
        debug!(reference = format_args!("{reference:#04x}"), tries, has_puk = puk.is_some(), "Stored PIN");
        let path = self.selected.clone();
        self.pins.insert(
            reference,
            StoredPin {
                path,
                value,
                tries,
                puk,
            },
        );
    }

    fn generate_key(&mut self, private_id: FileId, public_id: FileId, bits: u16) -> Result<Bytes> {
        let df = self.current_df()?;
        let private_path = df.join(private_id)?;
        let public_path = df.join(public_id)?;
        self.lookup(&private_path)?;
        self.lookup(&public_path)?;
        if bits == 0 || bits % 8 != 0 {
            return Err(Error::control_failure(
                Opcode::GenerateKey,
                format!("unsupported key length {bits}"),
            ));
        }

        let mut seed = self.serial.to_vec();
        seed.extend_from_slice(private_path.as_bytes());
        let modulus = keygen::modulus(&seed, usize::from(bits / 8));

        if let Some(public) = self.files.get_mut(&public_path) {
            public.data.clone_from(&modulus);
        }
        self.keys.insert(
            private_path,
            StoredKey {
                algorithm: Algorithm::Rsa,
                modulus: modulus.clone(),
                id: None,
                generated: true,
            },
        );
        Ok(Bytes::from(modulus))
    }

    fn update_key(&mut self, key_type: EfStructure, id: KeyId, key: &PrivateKey) -> Result<()> {
        let path = self
            .selected
            .clone()
            .ok_or(Error::InvalidArguments("no file selected"))?;
        let file = self.lookup(&path)?;
        if file.descriptor.file_type != FileType::InternalEf {
            return Err(Error::control_failure(
                Opcode::UpdateKey,
                format!("{path} is not a key file"),
            ));
        }

        let modulus = match (key_type, key) {
            (EfStructure::RsaCrt, PrivateKey::Rsa(rsa)) => rsa.modulus.clone(),
            (EfStructure::DsaPrivate, PrivateKey::Dsa(_)) => Vec::new(),
            _ => {
                return Err(Error::control_failure(
                    Opcode::UpdateKey,
                    "key structure does not match key material",
                ));
            }
        };
        self.keys.insert(
            path,
            StoredKey {
                algorithm: key.algorithm(),
                modulus,
                id: Some(id),
                generated: false,
            },
        );
        Ok(())
    }
}

impl CardFileSystem for SimulatedCard {
    fn select(&mut self, path: &Path) -> Result<FileDescriptor> {
        self.record(Call::Select { path: path.clone() })?;
        let descriptor = self.lookup(path)?.descriptor.clone();
        self.selected = Some(path.clone());
        Ok(descriptor)
    }

    fn create(&mut self, file: &FileDescriptor) -> Result<()> {
        self.record(Call::Create {
            path: file.path.clone(),
        })?;
        let parent = file
            .parent()
            .ok_or(Error::InvalidArguments("cannot create the MF"))?;
        if !self.lookup(&parent)?.descriptor.is_df() {
            return Err(Error::InvalidArguments("parent is not a DF"));
        }
        if self.selected.as_ref() != Some(&parent) {
            return Err(Error::InvalidArguments("parent DF is not selected"));
        }
        if file.path.file_id() != Some(file.id) {
            return Err(Error::InvalidArguments("file id does not match its path"));
        }
        self.check(&parent, AclOperation::Create)?;
        if self.files.contains_key(&file.path) {
            return Err(Error::FileAlreadyExists(file.path.clone()));
        }

        self.files.insert(
            file.path.clone(),
            SimFile {
                descriptor: file.clone(),
                data: Vec::new(),
            },
        );
        Ok(())
    }

    fn delete(&mut self, id: FileId) -> Result<()> {
        self.record(Call::Delete {
            parent: self.selected.clone(),
            id,
        })?;
        let parent = self
            .selected
            .clone()
            .ok_or(Error::InvalidArguments("no DF selected"))?;
        if !self.lookup(&parent)?.descriptor.is_df() {
            return Err(Error::InvalidArguments("selected file is not a DF"));
        }
        let target = parent.join(id)?;
        self.lookup(&target)?;
        self.check(&parent, AclOperation::Delete)?;

        let doomed = |path: &Path| path == &target || path.is_descendant_of(&target);
        self.files.retain(|path, _| !doomed(path));
        self.keys.retain(|path, _| !doomed(path));
        self.granted.retain(|(path, _)| !doomed(path));
        Ok(())
    }

    fn update(&mut self, file: &FileDescriptor, data: &[u8]) -> Result<()> {
        self.record(Call::Update {
            path: file.path.clone(),
            len: data.len(),
        })?;
        let stored = self.lookup(&file.path)?;
        if stored.descriptor.is_df() {
            return Err(Error::InvalidArguments("cannot update a DF"));
        }
        if data.len() > stored.descriptor.size {
            return Err(Error::InvalidArguments("data does not fit the file"));
        }
        self.check(&file.path, AclOperation::Update)?;

        if let Some(stored) = self.files.get_mut(&file.path) {
            stored.data = data.to_vec();
        }
        Ok(())
    }

    fn authenticate(&mut self, file: &FileDescriptor, operation: AclOperation) -> Result<()> {
        self.record(Call::Authenticate {
            path: file.path.clone(),
            operation,
        })?;
        let stored = self.lookup(&file.path)?;
        if stored.descriptor.acl.get(operation) == Some(AclMethod::Never) {
            return Err(Error::SecurityStatusNotSatisfied {
                path: file.path.clone(),
                operation,
            });
        }
        self.granted.insert((file.path.clone(), operation));
        Ok(())
    }

    fn reset_applications(&mut self) -> Result<()> {
        self.record(Call::ResetApplications)?;
        self.resets += 1;
        Ok(())
    }
}

impl CardControl for SimulatedCard {
    fn do_control(&mut self, opcode: Opcode, payload: &[u8]) -> Result<Bytes> {
        self.record(Call::Control { opcode })?;
        let request = ControlRequest::from_bytes(payload)
            .map_err(|e| Error::control_failure(opcode, e.to_string()))?;
        if request.opcode() != opcode {
            return Err(Error::control_failure(opcode, "opcode does not match template"));
        }
        self.controls.push(request.clone());

        match request {
            ControlRequest::CreatePin {
                reference,
                pin,
                pin_tries,
                puk,
                ..
            } => {
                self.create_pin(reference, pin, pin_tries, puk);
                Ok(Bytes::new())
            }
            ControlRequest::GenerateKey {
                private_id,
                public_id,
                bits,
                ..
            } => self.generate_key(private_id, public_id, bits),
            ControlRequest::UpdateKey { key_type, id, key } => {
                self.update_key(key_type, id, &key)?;
                Ok(Bytes::new())
            }
        }
    }
}
