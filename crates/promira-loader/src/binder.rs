//! Library binder with version gating
//!
//! A [`Binder`] owns at most one open library. The first resolution opens it,
//! asks its version symbol for the packed version word and checks both
//! directions of compatibility before any other symbol is handed out. A
//! library that fails the check is dropped again, so a later call starts
//! over from the open.

use crate::error::BindError;
use crate::locator::{library_file_name, Locator};
use log::{debug, error, info};
use once_cell::sync::OnceCell;
use promira_core::{LibraryVersion, Version};
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::{Mutex, MutexGuard};

/// Address of an exported symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSymbol(NonNull<c_void>);

// Symbol addresses stay valid for as long as the owning library is open,
// which the binder guarantees for every address it hands out.
unsafe impl Send for RawSymbol {}
unsafe impl Sync for RawSymbol {}

impl RawSymbol {
    /// Wrap a non-null symbol address
    pub fn new(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(RawSymbol)
    }

    /// Raw address
    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }

    /// Reinterpret the address as a function pointer
    ///
    /// # Safety
    ///
    /// `F` must be a function pointer type matching the exported symbol's
    /// signature and calling convention.
    pub unsafe fn cast<F: Copy>(self) -> F {
        assert_eq!(
            std::mem::size_of::<F>(),
            std::mem::size_of::<*mut c_void>(),
            "symbol can only be cast to a pointer-sized type"
        );
        let ptr = self.0.as_ptr();
        std::mem::transmute_copy::<*mut c_void, F>(&ptr)
    }
}

/// An opened shared library
pub trait SymbolTable: Send {
    /// Look up an exported symbol
    fn symbol(&self, name: &str) -> Option<RawSymbol>;
}

/// Opens shared libraries
pub trait Loader: Send + Sync {
    /// Open the library at `path` (or let the OS search for a bare name)
    fn open(&self, path: &Path) -> Result<Box<dyn SymbolTable>, String>;
}

/// The operating system's dynamic loader
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLoader;

struct NativeLibrary(libloading::Library);

impl SymbolTable for NativeLibrary {
    fn symbol(&self, name: &str) -> Option<RawSymbol> {
        // SAFETY: the symbol is only read as an address here; its type is
        // asserted later by whoever casts it.
        let sym = unsafe { self.0.get::<*mut c_void>(name.as_bytes()) }.ok()?;
        RawSymbol::new(*sym)
    }
}

impl Loader for NativeLoader {
    fn open(&self, path: &Path) -> Result<Box<dyn SymbolTable>, String> {
        // SAFETY: the vendor libraries have no initialisation routines with
        // preconditions.
        let lib = unsafe { libloading::Library::new(path) }.map_err(|e| e.to_string())?;
        Ok(Box::new(NativeLibrary(lib)))
    }
}

/// Static description of one vendor library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibrarySpec {
    /// File name without extension
    pub base_name: &'static str,
    /// Symbol returning the packed version word
    pub version_symbol: &'static str,
    /// API version these bindings implement
    pub header_version: Version,
    /// Oldest library version these bindings accept
    pub min_library_version: Version,
}

/// The Promira management library
pub const PLATFORM_LIBRARY: LibrarySpec = LibrarySpec {
    base_name: "promira",
    version_symbol: "pm_c_version",
    header_version: Version::new(1, 60),
    min_library_version: Version::new(1, 40),
};

/// The promact_is application library
pub const APP_LIBRARY: LibrarySpec = LibrarySpec {
    base_name: "promact_is",
    version_symbol: "ps_app_c_version",
    header_version: Version::new(1, 60),
    min_library_version: Version::new(1, 40),
};

impl LibrarySpec {
    /// Platform file name of the library
    pub fn file_name(&self) -> String {
        library_file_name(self.base_name)
    }

    /// Check a library's version word against these bindings
    pub fn check_compatible(&self, version: LibraryVersion) -> Result<(), BindError> {
        let library_too_old = version.software < self.min_library_version;
        let header_too_old = self.header_version < version.required_api;
        if !library_too_old && !header_too_old {
            return Ok(());
        }

        error!("Incompatible versions of {}:", self.file_name());
        if library_too_old {
            error!(
                "  Library version = v{} (requires library >= v{})",
                version.software, self.min_library_version
            );
        }
        if header_too_old {
            error!(
                "  Header version  = v{} (requires header >= v{})",
                self.header_version, version.required_api
            );
        }

        Err(BindError::IncompatibleVersion {
            name: self.file_name(),
            library: version.software,
            required_library: self.min_library_version,
            header: self.header_version,
            required_header: version.required_api,
        })
    }
}

struct Bound {
    library: Box<dyn SymbolTable>,
    version: LibraryVersion,
}

/// Lazily opened, version-checked vendor library
pub struct Binder {
    spec: LibrarySpec,
    loader: Box<dyn Loader>,
    search_name: OnceCell<PathBuf>,
    state: Mutex<Option<Bound>>,
}

impl std::fmt::Debug for Binder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binder")
            .field("spec", &self.spec)
            .field("search_name", &self.search_name.get())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl Binder {
    /// Binder using the operating system loader
    pub fn new(spec: LibrarySpec) -> Self {
        Self::with_loader(spec, Box::new(NativeLoader))
    }

    /// Binder using a custom loader
    pub fn with_loader(spec: LibrarySpec, loader: Box<dyn Loader>) -> Self {
        Self {
            spec,
            loader,
            search_name: OnceCell::new(),
            state: Mutex::new(None),
        }
    }

    /// Library this binder loads
    pub fn spec(&self) -> &LibrarySpec {
        &self.spec
    }

    /// Load the library from `dir` instead of searching for it
    ///
    /// Only effective before the first bind attempt; returns `false` once
    /// the search name has been fixed.
    pub fn set_library_dir(&self, dir: &Path) -> bool {
        let path = Locator::new(dir.join(self.spec.file_name())).search_name();
        self.search_name.set(path).is_ok()
    }

    /// Name handed to the OS loader, computed once
    pub fn search_name(&self) -> &Path {
        self.search_name
            .get_or_init(|| Locator::new(self.spec.file_name()).search_name())
    }

    /// Whether a compatible library is currently open
    pub fn is_loaded(&self) -> bool {
        self.lock().is_some()
    }

    /// Version word of the open library
    pub fn library_version(&self) -> Option<LibraryVersion> {
        self.lock().as_ref().map(|bound| bound.version)
    }

    /// Resolve an exported symbol, opening the library on first use
    pub fn resolve(&self, symbol: &'static str) -> Result<RawSymbol, BindError> {
        let mut state = self.lock();
        if state.is_none() {
            *state = Some(self.bind()?);
        }
        state
            .as_ref()
            .and_then(|bound| bound.library.symbol(symbol))
            .ok_or(BindError::FunctionNotFound(symbol))
    }

    fn lock(&self) -> MutexGuard<'_, Option<Bound>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn bind(&self) -> Result<Bound, BindError> {
        let path = self.search_name();
        debug!("Opening {}", path.display());

        let library = self.loader.open(path).map_err(|reason| {
            error!("Unable to load {}: {}", path.display(), reason);
            BindError::LibraryNotFound {
                name: path.display().to_string(),
                reason,
            }
        })?;

        let version_fn = library.symbol(self.spec.version_symbol).ok_or_else(|| {
            error!(
                "Unable to bind {}() in {}",
                self.spec.version_symbol,
                path.display()
            );
            BindError::MissingVersionSymbol {
                name: path.display().to_string(),
                symbol: self.spec.version_symbol,
            }
        })?;

        // SAFETY: every vendor version symbol is `u32 fn(void)`.
        let version_fn: unsafe extern "C" fn() -> u32 = unsafe { version_fn.cast() };
        let version = LibraryVersion::from_word(unsafe { version_fn() });

        // Dropping `library` on failure closes it again.
        self.spec.check_compatible(version)?;

        info!(
            "Loaded {} v{} (requires API >= v{})",
            path.display(),
            version.software,
            version.required_api
        );
        Ok(Bound { library, version })
    }
}
