//! Maps visibility to unix permission bits and back / 可见性与 unix 权限位的映射

use super::config::PermissionMap;
use crate::storage::Visibility;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortableVisibilityConverter {
    file_public: u32,
    file_private: u32,
    directory_public: u32,
    directory_private: u32,
    default_for_directories: Visibility,
}

impl Default for PortableVisibilityConverter {
    fn default() -> Self {
        Self {
            file_public: 0o644,
            file_private: 0o600,
            directory_public: 0o755,
            directory_private: 0o700,
            default_for_directories: Visibility::Private,
        }
    }
}

impl PortableVisibilityConverter {
    pub fn from_permissions(permissions: &PermissionMap, default_for_directories: Visibility) -> Self {
        let d = Self::default();
        Self {
            file_public: permissions.file.public.unwrap_or(d.file_public),
            file_private: permissions.file.private.unwrap_or(d.file_private),
            directory_public: permissions.dir.public.unwrap_or(d.directory_public),
            directory_private: permissions.dir.private.unwrap_or(d.directory_private),
            default_for_directories,
        }
    }

    pub fn for_file(&self, visibility: Visibility) -> u32 {
        match visibility {
            Visibility::Public => self.file_public,
            Visibility::Private => self.file_private,
        }
    }

    pub fn for_directory(&self, visibility: Visibility) -> u32 {
        match visibility {
            Visibility::Public => self.directory_public,
            Visibility::Private => self.directory_private,
        }
    }

    /// Anything other than the private mode reads as public / 非私有权限即视为公开
    pub fn inverse_for_file(&self, mode: u32) -> Visibility {
        if mode == self.file_private {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }

    pub fn inverse_for_directory(&self, mode: u32) -> Visibility {
        if mode == self.directory_private {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }

    pub fn default_for_directories(&self) -> Visibility {
        self.default_for_directories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::config::ModePair;

    #[test]
    fn test_default_modes() {
        let c = PortableVisibilityConverter::default();
        assert_eq!(c.for_file(Visibility::Public), 0o644);
        assert_eq!(c.for_file(Visibility::Private), 0o600);
        assert_eq!(c.for_directory(Visibility::Public), 0o755);
        assert_eq!(c.for_directory(Visibility::Private), 0o700);
        assert_eq!(c.default_for_directories(), Visibility::Private);
    }

    #[test]
    fn test_overrides_and_inverse() {
        let permissions = PermissionMap {
            file: ModePair { public: Some(0o664), private: None },
            dir: ModePair { public: None, private: Some(0o750) },
        };
        let c = PortableVisibilityConverter::from_permissions(&permissions, Visibility::Public);
        assert_eq!(c.for_file(Visibility::Public), 0o664);
        assert_eq!(c.for_file(Visibility::Private), 0o600);
        assert_eq!(c.for_directory(Visibility::Private), 0o750);
        assert_eq!(c.inverse_for_file(0o600), Visibility::Private);
        assert_eq!(c.inverse_for_file(0o664), Visibility::Public);
        assert_eq!(c.inverse_for_file(0o640), Visibility::Public);
        assert_eq!(c.inverse_for_directory(0o750), Visibility::Private);
        assert_eq!(c.default_for_directories(), Visibility::Public);
    }
}
