use std::ffi::{c_char, c_int, c_void};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use libloading::Library;
use tracing::{debug, info};

use super::{BindFn, DispatchFn};
use crate::config::WebviewConfig;
use crate::error::NativeError;

pub(crate) type Handle = *mut c_void;

/// Entry points resolved from the native webview library.
pub struct WebviewLibrary {
    pub(crate) create: unsafe extern "C" fn(c_int, *mut c_void) -> Handle,
    pub(crate) destroy: unsafe extern "C" fn(Handle),
    pub(crate) run: unsafe extern "C" fn(Handle),
    pub(crate) terminate: unsafe extern "C" fn(Handle),
    pub(crate) dispatch: unsafe extern "C" fn(Handle, DispatchFn, *mut c_void),
    pub(crate) get_window: unsafe extern "C" fn(Handle) -> *mut c_void,
    pub(crate) set_title: unsafe extern "C" fn(Handle, *const c_char),
    pub(crate) set_size: unsafe extern "C" fn(Handle, c_int, c_int, c_int),
    pub(crate) navigate: unsafe extern "C" fn(Handle, *const c_char),
    pub(crate) set_html: unsafe extern "C" fn(Handle, *const c_char),
    pub(crate) init: unsafe extern "C" fn(Handle, *const c_char),
    pub(crate) eval: unsafe extern "C" fn(Handle, *const c_char),
    pub(crate) bind: unsafe extern "C" fn(Handle, *const c_char, BindFn, *mut c_void),
    pub(crate) unbind: unsafe extern "C" fn(Handle, *const c_char),
    pub(crate) return_: unsafe extern "C" fn(Handle, *const c_char, c_int, *const c_char),
    path: PathBuf,
    _library: Library,
}

static LOADED: OnceLock<WebviewLibrary> = OnceLock::new();

impl WebviewLibrary {
    /// Load the library once per process. Later calls return the same instance.
    pub fn load(config: &WebviewConfig) -> Result<&'static WebviewLibrary, NativeError> {
        if let Some(library) = LOADED.get() {
            return Ok(library);
        }
        let library = Self::open(config)?;
        Ok(LOADED.get_or_init(|| library))
    }

    fn open(config: &WebviewConfig) -> Result<Self, NativeError> {
        let candidates = library_candidates(config);
        let path = candidates
            .iter()
            .find(|candidate| candidate.is_file())
            .cloned()
            .unwrap_or_else(|| PathBuf::from(config.library_name()));
        debug!(target: "native", path = %path.display(), "loading webview library");

        // SAFETY: loading runs the library's initialisers; the webview
        // library has no unusual load-time requirements.
        let library = unsafe { Library::new(&path) }.map_err(|err| {
            if candidates.iter().any(|candidate| candidate == &path) {
                NativeError::Load(err)
            } else {
                debug!(target: "native", error = %err, "system loader could not find library");
                NativeError::LibraryNotFound {
                    searched: candidates.clone(),
                }
            }
        })?;

        // SAFETY: each field type below matches the webview C API declaration
        // of the symbol it is resolved from.
        let loaded = unsafe {
            Self {
                create: symbol(&library, "webview_create")?,
                destroy: symbol(&library, "webview_destroy")?,
                run: symbol(&library, "webview_run")?,
                terminate: symbol(&library, "webview_terminate")?,
                dispatch: symbol(&library, "webview_dispatch")?,
                get_window: symbol(&library, "webview_get_window")?,
                set_title: symbol(&library, "webview_set_title")?,
                set_size: symbol(&library, "webview_set_size")?,
                navigate: symbol(&library, "webview_navigate")?,
                set_html: symbol(&library, "webview_set_html")?,
                init: symbol(&library, "webview_init")?,
                eval: symbol(&library, "webview_eval")?,
                bind: symbol(&library, "webview_bind")?,
                unbind: symbol(&library, "webview_unbind")?,
                return_: symbol(&library, "webview_return")?,
                path,
                _library: library,
            }
        };
        info!(target: "native", path = %loaded.path.display(), "webview library loaded");
        Ok(loaded)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// # Safety
///
/// `T` must be the function pointer type of the exported symbol `name`.
unsafe fn symbol<T: Copy>(library: &Library, name: &'static str) -> Result<T, NativeError> {
    library
        .get::<T>(name.as_bytes())
        .map(|symbol| *symbol)
        .map_err(|source| NativeError::MissingSymbol { name, source })
}

/// Where to look for the native library, in priority order.
pub fn library_candidates(config: &WebviewConfig) -> Vec<PathBuf> {
    let name = config.library_name();
    let mut dirs: Vec<PathBuf> = config.search_paths.clone();

    if let Some(exec_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        let frameworks = exec_dir.join("..").join("Frameworks");
        dirs.push(exec_dir);
        if cfg!(target_os = "macos") {
            dirs.push(frameworks);
        }
    }

    dirs.into_iter().map(|dir| dir.join(&name)).collect()
}
