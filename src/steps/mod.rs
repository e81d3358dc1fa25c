pub mod fstab;
pub mod grub;
pub mod initramfs;
pub mod privilege;
pub mod resume;
pub mod swapfile;
