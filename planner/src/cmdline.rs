// Licensed under the Apache-2.0 license

//! Helpers for the boot command line handed to a compute tile.

/// The binary loaded onto the tile.
pub fn program(cmdline: &str) -> &str {
    cmdline.split_whitespace().next().unwrap_or("")
}

pub fn argc(cmdline: &str) -> usize {
    cmdline.split_whitespace().count()
}

/// Tiles running the kernel get the boot-module window mapped.
pub fn is_kernel(cmdline: &str) -> bool {
    cmdline.contains("kernel")
}

/// Arguments consumed by the kernel itself rather than passed to a boot module.
pub fn is_kernel_arg(arg: &str) -> bool {
    arg == "daemon"
        || ["requires=", "core=", "pes=", "repeat="]
            .iter()
            .any(|prefix| arg.starts_with(prefix))
}
