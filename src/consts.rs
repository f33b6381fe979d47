// The path to the vba file within an xlsm or xlsb file
pub const ZIP_VBA_PATH: &str = "xl/vbaProject.bin";

// Streams that mark a storage within the compound file as holding a VBA project
pub const DIR_STREAM: &str = "dir";
pub const VBA_PROJECT_STREAM: &str = "_VBA_PROJECT";

// The project properties stream, which sits alongside the VBA storage
pub const PROJECT_STREAM: &str = "PROJECT";

// Prefix for the scratch directory the vbaProject.bin file is unpacked into
pub const TEMP_DIR_PREFIX: &str = "extract_vba";
