use std::{
    fs,
    io::{Read, Seek, SeekFrom},
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use crate::{
    config::RunConfig,
    error::HibernateError,
    gate::{Action, Gate},
    host::HostTools,
    ui,
};

const SWAP_MODE: u32 = 0o600;

// Kernel swap header: magic in the last 10 bytes of the first page.
const SWAP_MAGICS: [&[u8]; 2] = [b"SWAPSPACE2", b"SWAP-SPACE"];
const PAGE_SIZES: [u64; 3] = [4096, 16384, 65536];

// ── Probed state ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapfileState {
    pub path: PathBuf,
    pub exists: bool,
    pub size_bytes: u64,
    pub mode: u32,
    pub is_swap_formatted: bool,
    pub is_active: bool,
}

impl SwapfileState {
    pub fn probe(path: &Path, tools: &dyn HostTools) -> Result<Self, HibernateError> {
        let meta = match fs::metadata(path) {
            Ok(m) => Some(m),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let Some(meta) = meta else {
            return Ok(Self {
                path: path.to_path_buf(),
                exists: false,
                size_bytes: 0,
                mode: 0,
                is_swap_formatted: false,
                is_active: false,
            });
        };

        let is_active = tools.active_swaps()?.iter().any(|p| p == path);
        Ok(Self {
            path: path.to_path_buf(),
            exists: true,
            size_bytes: meta.len(),
            mode: meta.permissions().mode() & 0o777,
            is_swap_formatted: has_swap_signature(path)?,
            is_active,
        })
    }
}

fn has_swap_signature(path: &Path) -> Result<bool, HibernateError> {
    let mut f = fs::File::open(path)?;
    let len = f.metadata()?.len();
    let mut magic = [0u8; 10];

    for page in PAGE_SIZES {
        if len < page {
            break;
        }
        f.seek(SeekFrom::Start(page - 10))?;
        f.read_exact(&mut magic)?;
        if SWAP_MAGICS.iter().any(|m| *m == magic.as_slice()) {
            return Ok(true);
        }
    }
    Ok(false)
}

// ── Planning ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Deactivate,
    Remove,
    Allocate,
    RestrictMode,
    Format,
    Activate,
}

const FULL_SEQUENCE: [Step; 4] = [Step::Allocate, Step::RestrictMode, Step::Format, Step::Activate];

/// Decides which steps are still needed, from one probe taken up front.
///
/// A wrongly sized file is only replaced when the operator explicitly
/// agrees; otherwise `SizeMismatch`.
pub fn plan(
    state: &SwapfileState,
    expected_bytes: u64,
    gate: &Gate<'_>,
) -> Result<Vec<Step>, HibernateError> {
    if !state.exists {
        return Ok(FULL_SEQUENCE.to_vec());
    }

    if state.size_bytes != expected_bytes {
        ui::print_warning(&format!(
            "{} already exists with {} bytes, {} bytes requested.",
            state.path.display(),
            state.size_bytes,
            expected_bytes
        ));
        if !gate.ask("Delete and recreate it? Its current contents will be lost")? {
            return Err(HibernateError::SizeMismatch {
                path: state.path.clone(),
                expected: expected_bytes,
                actual: state.size_bytes,
            });
        }

        let mut steps = Vec::new();
        if state.is_active {
            steps.push(Step::Deactivate);
        }
        steps.push(Step::Remove);
        steps.extend(FULL_SEQUENCE);
        return Ok(steps);
    }

    let mut steps = Vec::new();
    if state.mode != SWAP_MODE {
        steps.push(Step::RestrictMode);
    }
    if !state.is_swap_formatted {
        steps.push(Step::Format);
    }
    if !state.is_active {
        steps.push(Step::Activate);
    }
    Ok(steps)
}

// ── Execution ─────────────────────────────────────────────────────────────────

/// Brings the swapfile to: exact size, mode 0600, formatted, active.
pub fn run(
    config: &RunConfig,
    path: &Path,
    tools: &dyn HostTools,
    gate: &Gate<'_>,
) -> Result<(), HibernateError> {
    let state = SwapfileState::probe(path, tools)?;
    log::debug!("swapfile state: {:?}", state);

    let steps = plan(&state, config.swap_size_bytes(), gate)?;
    if steps.is_empty() {
        ui::print_success(&format!(
            "{} is already allocated, formatted and active.",
            path.display()
        ));
        return Ok(());
    }

    let p = path.to_string_lossy();
    let size_gb = config.swap_size_gb.get();

    for step in steps {
        match step {
            Step::Deactivate => {
                gate.apply(&Action::Run(format!("swapoff {}", p)), || {
                    tools.deactivate_swap(path)
                })?;
            }
            Step::Remove => {
                gate.apply(&Action::RemoveFile { path }, || {
                    fs::remove_file(path)?;
                    Ok(())
                })?;
            }
            Step::Allocate => {
                gate.apply(
                    &Action::Run(format!("fallocate -l {}G {}", size_gb, p)),
                    || tools.allocate(path, size_gb),
                )?;
            }
            Step::RestrictMode => {
                gate.apply(&Action::SetMode { path, mode: SWAP_MODE }, || {
                    fs::set_permissions(path, fs::Permissions::from_mode(SWAP_MODE))?;
                    ui::print_success(&format!("{} restricted to mode 0600.", p));
                    Ok(())
                })?;
            }
            Step::Format => {
                gate.apply(&Action::Run(format!("mkswap {}", p)), || {
                    tools.format_swap(path)
                })?;
            }
            Step::Activate => {
                gate.apply(&Action::Run(format!("swapon {}", p)), || {
                    tools.activate_swap(path)
                })?;
            }
        }
    }

    Ok(())
}
