//! Global constants used throughout the addonpack codebase.
//!
//! File names, extension lists, archive layout fragments and the fixed limits
//! of the preprocessor live here so the magic values are discoverable in one place.

/// Bare prefix marker: first line without `=` is the addon prefix.
pub const PREFIX_MARKER: &str = "$PBOPREFIX$";

/// Keyed prefix marker: a `prefix=` line holds the addon prefix.
pub const PREFIX_MARKER_TXT: &str = "$PBOPREFIX$.txt";

/// Marker files that disable binarization for the whole addon.
pub const NO_BINARIZE_MARKERS: [&str; 2] = ["$NOBIN$", "$NOBIN-NOTEST$"];

/// Name of the text config source that is compiled to [`CONFIG_BINARY_NAME`].
pub const CONFIG_SOURCE_NAME: &str = "config.cpp";

/// Name of the compiled config.
pub const CONFIG_BINARY_NAME: &str = "config.bin";

/// Directory-level model config companion.
pub const MODEL_CONFIG_NAME: &str = "model.cfg";

/// Extensions that never make it into an archive.
pub const EXCLUDED_EXTENSIONS: [&str; 4] = ["cfg", "tga", "dep", "ignore"];

/// Extensions handed to the config compiler.
pub const CONFIG_EXTENSIONS: [&str; 3] = ["cpp", "rvmat", "ext"];

/// Extension of MLOD/ODOL models.
pub const MODEL_EXTENSION: &str = "p3d";

/// Extension of terrains.
pub const TERRAIN_EXTENSION: &str = "wrp";

/// Uncompressed image extensions that may be satisfied by a compressed texture.
pub const SUBSTITUTABLE_IMAGE_EXTENSIONS: [&str; 2] = ["tga", "png"];

/// Extension of compressed textures.
pub const TEXTURE_EXTENSION: &str = "paa";

/// Maximum depth of nested `#include`s.
pub const MAX_INCLUDE_DEPTH: usize = 64;

/// Maximum number of whole-line expansion passes before giving up.
pub const MAX_EXPANSION_PASSES: usize = 64;

/// First 28 bytes of every archive: version entry followed by the `prefix` key.
pub const ARCHIVE_HEADER_BLOCK: [u8; 28] = *b"\0sreV\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0prefix\0";

/// Length of the zero record separating headers from payload.
pub const ARCHIVE_BOUNDARY_LEN: usize = 21;

/// Length of the SHA-1 digest in the trailer.
pub const ARCHIVE_HASH_LEN: usize = 20;

/// Required extension of signing keys.
pub const PRIVATE_KEY_EXTENSION: &str = "biprivatekey";

/// Extension of detached signatures.
pub const SIGNATURE_EXTENSION: &str = "bisign";

/// Name of the directory created under the temp base.
pub const TEMP_DIR_NAME: &str = "addonpack";

/// Environment variable that disables progress bars when set.
pub const NO_PROGRESS_ENV: &str = "ADDONPACK_NO_PROGRESS";

/// Environment variable that lets external tool output through when set.
pub const TOOL_OUTPUT_ENV: &str = "ADDONPACK_TOOL_OUTPUT";

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "ADDONPACK_CONFIG";
