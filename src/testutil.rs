//! Fakes shared by the unit tests.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    fs,
    io::{Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use crate::{
    config::GIB,
    error::HibernateError,
    gate::Prompter,
    host::{Extent, ExtentMap, HostTools, MountSource},
};

// ── Prompter ──────────────────────────────────────────────────────────────────

/// Answers questions from a fixed script and panics when asked more.
pub struct ScriptedPrompter {
    answers: RefCell<VecDeque<bool>>,
    asked: Cell<usize>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[bool]) -> Self {
        Self {
            answers: RefCell::new(answers.iter().copied().collect()),
            asked: Cell::new(0),
        }
    }

    /// Any question at all fails the test.
    pub fn refusing_to_be_asked() -> Self {
        Self::new(&[])
    }

    pub fn questions_asked(&self) -> usize {
        self.asked.get()
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, prompt: &str, _default: bool) -> Result<bool, HibernateError> {
        self.asked.set(self.asked.get() + 1);
        match self.answers.borrow_mut().pop_front() {
            Some(answer) => Ok(answer),
            None => panic!("unexpected prompt: {prompt}"),
        }
    }
}

// ── HostTools ─────────────────────────────────────────────────────────────────

/// Records every call; mutating calls touch real files under a tempdir so
/// the probes see their effect.
pub struct FakeTools {
    pub calls: RefCell<Vec<String>>,
    pub active: RefCell<Vec<PathBuf>>,
    pub extents: RefCell<ExtentMap>,
    pub uuid: String,
    pub fstype: String,
    pub btrfs_offset: u64,
    pub page_size: u64,
    pub fail_initramfs: bool,
    pub fail_grub: bool,
}

impl Default for FakeTools {
    fn default() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            active: RefCell::new(Vec::new()),
            extents: RefCell::new(ExtentMap {
                file_size: 8 * 4096,
                block_size: 4096,
                extents: vec![Extent {
                    physical_start: 4096,
                    length: 8,
                }],
            }),
            uuid: "ABCD-1234".to_string(),
            fstype: "ext4".to_string(),
            btrfs_offset: 0,
            page_size: 4096,
            fail_initramfs: false,
            fail_grub: false,
        }
    }
}

impl FakeTools {
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn called(&self, name: &str) -> bool {
        self.calls.borrow().iter().any(|c| c.starts_with(name))
    }

    pub fn set_first_extent(&self, physical_start: u64) {
        self.extents.borrow_mut().extents[0].physical_start = physical_start;
    }

    pub fn mark_active(&self, path: &Path) {
        self.active.borrow_mut().push(path.to_path_buf());
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

/// Writes the swap magic where the kernel expects it for 4 KiB pages.
pub fn write_swap_signature(path: &Path) {
    let mut f = fs::OpenOptions::new().write(true).open(path).unwrap();
    f.seek(SeekFrom::Start(4096 - 10)).unwrap();
    f.write_all(b"SWAPSPACE2").unwrap();
}

impl HostTools for FakeTools {
    fn allocate(&self, path: &Path, size_gb: u64) -> Result<(), HibernateError> {
        self.record(format!("allocate {} {}", path.display(), size_gb));
        let f = fs::File::create(path)?;
        f.set_len(size_gb * GIB)?;
        Ok(())
    }

    fn format_swap(&self, path: &Path) -> Result<(), HibernateError> {
        self.record(format!("format_swap {}", path.display()));
        write_swap_signature(path);
        Ok(())
    }

    fn activate_swap(&self, path: &Path) -> Result<(), HibernateError> {
        self.record(format!("activate_swap {}", path.display()));
        self.mark_active(path);
        Ok(())
    }

    fn deactivate_swap(&self, path: &Path) -> Result<(), HibernateError> {
        self.record(format!("deactivate_swap {}", path.display()));
        self.active.borrow_mut().retain(|p| p != path);
        Ok(())
    }

    fn active_swaps(&self) -> Result<Vec<PathBuf>, HibernateError> {
        Ok(self.active.borrow().clone())
    }

    fn extent_map(&self, path: &Path) -> Result<ExtentMap, HibernateError> {
        self.record(format!("extent_map {}", path.display()));
        Ok(self.extents.borrow().clone())
    }

    fn mount_source(&self, path: &Path) -> Result<MountSource, HibernateError> {
        self.record(format!("mount_source {}", path.display()));
        Ok(MountSource {
            device: "/dev/fake1".to_string(),
            fstype: self.fstype.clone(),
        })
    }

    fn filesystem_uuid(&self, device: &str) -> Result<String, HibernateError> {
        self.record(format!("filesystem_uuid {}", device));
        Ok(self.uuid.clone())
    }

    fn btrfs_resume_offset(&self, path: &Path) -> Result<u64, HibernateError> {
        self.record(format!("btrfs_resume_offset {}", path.display()));
        Ok(self.btrfs_offset)
    }

    fn page_size(&self) -> Result<u64, HibernateError> {
        Ok(self.page_size)
    }

    fn regenerate_grub(&self, output: &Path) -> Result<(), HibernateError> {
        self.record(format!("regenerate_grub {}", output.display()));
        if self.fail_grub {
            return Err(HibernateError::CommandFailed {
                program: "grub-mkconfig".to_string(),
                code: 1,
                stderr: "syntax error".to_string(),
            });
        }
        Ok(())
    }

    fn rebuild_initramfs(&self) -> Result<(), HibernateError> {
        self.record("rebuild_initramfs".to_string());
        if self.fail_initramfs {
            return Err(HibernateError::CommandFailed {
                program: "mkinitcpio".to_string(),
                code: 1,
                stderr: "==> ERROR: module not found: 'bogus'".to_string(),
            });
        }
        Ok(())
    }
}
