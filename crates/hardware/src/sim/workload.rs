//! Workload images and processes.
//!
//! This module resolves the executable every core runs. It performs:
//! 1. **Image loading:** Reads the binary from disk; ELF files are parsed with `object`
//!    into text and data sections, anything else is treated as a flat image at address 0.
//! 2. **ISA description:** Architecture, word size, byte order and entry point, resolved
//!    once and shared by every process.
//! 3. **Processes:** One `Process` per core, each an independent instance of the same
//!    command line with its own pid.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use object::{Object, ObjectSection, SectionKind};

use crate::common::{EngineFault, TopologyError};
use crate::common::constants::PROCESS_PID_BASE;
use crate::soc::component::ComponentId;

/// Container format of a workload image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    /// ELF executable.
    Elf,
    /// Raw bytes with no headers.
    Flat,
}

/// Byte order of the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    /// Least significant byte first.
    Little,
    /// Most significant byte first.
    Big,
}

/// ISA/ABI facts about the workload, shared by every process that runs it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IsaDescriptor {
    /// Container format.
    pub format: ImageFormat,
    /// Target architecture as reported by the image.
    pub architecture: String,
    /// Address width in bits.
    pub address_bits: u32,
    /// Byte order.
    pub byte_order: ByteOrder,
    /// Entry point.
    pub entry: u64,
}

impl fmt::Display for IsaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-bit {:?}-endian, entry {:#x}",
            self.architecture, self.address_bits, self.byte_order, self.entry
        )
    }
}

/// What a loaded section holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SectionRole {
    /// Executable code.
    Text,
    /// Initialised or zero-filled data.
    Data,
}

/// One allocated section of an image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageSection {
    /// Virtual address of the first byte.
    pub addr: u64,
    /// Size in memory.
    pub size: u64,
    /// Contents; empty for zero-filled sections.
    pub bytes: Vec<u8>,
    /// Code or data.
    pub role: SectionRole,
}

/// A resolved workload binary.
#[derive(Clone, Debug)]
pub struct WorkloadImage {
    /// Where it was loaded from.
    pub path: PathBuf,
    /// ISA facts.
    pub isa: IsaDescriptor,
    /// Allocated sections in address order.
    pub sections: Vec<ImageSection>,
}

const ELF_MAGIC: &[u8; 4] = b"\x7fELF";

impl WorkloadImage {
    /// Reads and parses the image at `path`.
    ///
    /// # Errors
    ///
    /// * [`EngineFault::ImageRead`] if the file cannot be read.
    /// * [`EngineFault::ImageParse`] if it carries an ELF header but is not a valid ELF file.
    pub fn load(path: &Path) -> Result<Self, EngineFault> {
        let data = fs::read(path).map_err(|source| EngineFault::ImageRead {
            path: path.to_path_buf(),
            source,
        })?;
        if data.starts_with(ELF_MAGIC) {
            Self::from_elf(path, &data)
        } else {
            Ok(Self::from_flat(path, data))
        }
    }

    fn from_elf(path: &Path, data: &[u8]) -> Result<Self, EngineFault> {
        let parse_error = |reason: String| EngineFault::ImageParse {
            path: path.to_path_buf(),
            reason,
        };
        let file = object::File::parse(data).map_err(|e| parse_error(e.to_string()))?;

        let mut sections = Vec::new();
        for section in file.sections() {
            let role = match section.kind() {
                SectionKind::Text => SectionRole::Text,
                SectionKind::Data
                | SectionKind::ReadOnlyData
                | SectionKind::ReadOnlyString
                | SectionKind::UninitializedData => SectionRole::Data,
                _ => continue,
            };
            if section.size() == 0 || (section.address() == 0 && role == SectionRole::Data) {
                continue;
            }
            let bytes = if section.kind() == SectionKind::UninitializedData {
                Vec::new()
            } else {
                section
                    .data()
                    .map_err(|e| parse_error(e.to_string()))?
                    .to_vec()
            };
            sections.push(ImageSection {
                addr: section.address(),
                size: section.size(),
                bytes,
                role,
            });
        }
        sections.sort_by_key(|s| s.addr);

        let isa = IsaDescriptor {
            format: ImageFormat::Elf,
            architecture: format!("{:?}", file.architecture()).to_lowercase(),
            address_bits: if file.is_64() { 64 } else { 32 },
            byte_order: if file.is_little_endian() {
                ByteOrder::Little
            } else {
                ByteOrder::Big
            },
            entry: file.entry(),
        };
        Ok(Self {
            path: path.to_path_buf(),
            isa,
            sections,
        })
    }

    fn from_flat(path: &Path, data: Vec<u8>) -> Self {
        let isa = IsaDescriptor {
            format: ImageFormat::Flat,
            architecture: "unknown".to_string(),
            address_bits: 64,
            byte_order: ByteOrder::Little,
            entry: 0,
        };
        let sections = if data.is_empty() {
            Vec::new()
        } else {
            vec![ImageSection {
                addr: 0,
                size: data.len() as u64,
                bytes: data,
                role: SectionRole::Text,
            }]
        };
        Self {
            path: path.to_path_buf(),
            isa,
            sections,
        }
    }

    /// Executable sections in address order.
    pub fn text(&self) -> impl Iterator<Item = &ImageSection> + '_ {
        self.sections.iter().filter(|s| s.role == SectionRole::Text)
    }

    /// Total bytes of executable code.
    pub fn text_bytes(&self) -> u64 {
        self.text().map(|s| s.bytes.len() as u64).sum()
    }

    /// Lowest and one-past-highest virtual address of the data sections, falling back
    /// to the whole image when it has none.
    pub fn data_span(&self) -> Option<(u64, u64)> {
        let data = self.sections.iter().filter(|s| s.role == SectionRole::Data);
        Self::span(data).or_else(|| self.image_span())
    }

    /// Lowest and one-past-highest virtual address of all sections.
    pub fn image_span(&self) -> Option<(u64, u64)> {
        Self::span(self.sections.iter())
    }

    fn span<'a>(sections: impl Iterator<Item = &'a ImageSection>) -> Option<(u64, u64)> {
        sections.fold(None, |acc, s| {
            let end = s.addr.saturating_add(s.size);
            Some(acc.map_or((s.addr, end), |(lo, hi): (u64, u64)| {
                (lo.min(s.addr), hi.max(end))
            }))
        })
    }
}

/// The system-wide workload: one image shared by every process.
#[derive(Clone, Debug)]
pub struct SeWorkload {
    /// Graph node.
    pub component: ComponentId,
    /// The resolved image.
    pub image: Arc<WorkloadImage>,
}

impl SeWorkload {
    /// ISA facts of the shared image.
    pub fn isa(&self) -> &IsaDescriptor {
        &self.image.isa
    }
}

/// One process: an independent instance of the workload bound to one cpu.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Process {
    /// Graph node.
    pub component: ComponentId,
    /// Process id.
    pub pid: u32,
    /// Command line, executable first.
    pub cmd: Vec<String>,
    /// Cpu running the process.
    pub cpu_id: usize,
}

impl Process {
    /// Creates the process for core `cpu_id` running `binary` with no arguments.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::PidOutOfRange`] if `PROCESS_PID_BASE + cpu_id` does not
    /// fit in a `u32`.
    pub fn for_core(
        component: ComponentId,
        cpu_id: usize,
        binary: &Path,
    ) -> Result<Self, TopologyError> {
        let pid = u32::try_from(cpu_id)
            .ok()
            .and_then(|id| PROCESS_PID_BASE.checked_add(id))
            .ok_or(TopologyError::PidOutOfRange(cpu_id))?;
        Ok(Self {
            component,
            pid,
            cmd: vec![binary.display().to_string()],
            cpu_id,
        })
    }
}
