//! Per-table column layouts (ECMA-335 II.22).

use crate::tables::{CodedIndexKind, TableId};

/// One column of a table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// Fixed 2-byte constant.
    U16,
    /// Fixed 4-byte constant.
    U32,
    /// Index into #Strings.
    Str,
    /// Index into #GUID.
    Guid,
    /// Index into #Blob.
    Blob,
    /// Row index into a single table.
    Index(TableId),
    /// Coded index.
    Coded(CodedIndexKind),
}

use CodedIndexKind as C;
use Column::{Blob, Coded, Guid, Index, Str, U16, U32};

impl TableId {
    /// Columns of this table, in on-disk order.
    #[must_use]
    pub const fn columns(self) -> &'static [Column] {
        match self {
            Self::Module => &[U16, Str, Guid, Guid, Guid],
            Self::TypeRef => &[Coded(C::ResolutionScope), Str, Str],
            Self::TypeDef => &[
                U32,
                Str,
                Str,
                Coded(C::TypeDefOrRef),
                Index(TableId::Field),
                Index(TableId::MethodDef),
            ],
            Self::FieldPtr => &[Index(TableId::Field)],
            Self::Field => &[U16, Str, Blob],
            Self::MethodPtr => &[Index(TableId::MethodDef)],
            Self::MethodDef => &[U32, U16, U16, Str, Blob, Index(TableId::Param)],
            Self::ParamPtr => &[Index(TableId::Param)],
            Self::Param => &[U16, U16, Str],
            Self::InterfaceImpl => &[Index(TableId::TypeDef), Coded(C::TypeDefOrRef)],
            Self::MemberRef => &[Coded(C::MemberRefParent), Str, Blob],
            // Type is a 1-byte constant followed by a padding byte.
            Self::Constant => &[U16, Coded(C::HasConstant), Blob],
            Self::CustomAttribute => &[
                Coded(C::HasCustomAttribute),
                Coded(C::CustomAttributeType),
                Blob,
            ],
            Self::FieldMarshal => &[Coded(C::HasFieldMarshal), Blob],
            Self::DeclSecurity => &[U16, Coded(C::HasDeclSecurity), Blob],
            Self::ClassLayout => &[U16, U32, Index(TableId::TypeDef)],
            Self::FieldLayout => &[U32, Index(TableId::Field)],
            Self::StandAloneSig => &[Blob],
            Self::EventMap => &[Index(TableId::TypeDef), Index(TableId::Event)],
            Self::EventPtr => &[Index(TableId::Event)],
            Self::Event => &[U16, Str, Coded(C::TypeDefOrRef)],
            Self::PropertyMap => &[Index(TableId::TypeDef), Index(TableId::Property)],
            Self::PropertyPtr => &[Index(TableId::Property)],
            Self::Property => &[U16, Str, Blob],
            Self::MethodSemantics => &[U16, Index(TableId::MethodDef), Coded(C::HasSemantics)],
            Self::MethodImpl => &[
                Index(TableId::TypeDef),
                Coded(C::MethodDefOrRef),
                Coded(C::MethodDefOrRef),
            ],
            Self::ModuleRef => &[Str],
            Self::TypeSpec => &[Blob],
            Self::ImplMap => &[
                U16,
                Coded(C::MemberForwarded),
                Str,
                Index(TableId::ModuleRef),
            ],
            Self::FieldRva => &[U32, Index(TableId::Field)],
            Self::EncLog => &[U32, U32],
            Self::EncMap => &[U32],
            Self::Assembly => &[U32, U16, U16, U16, U16, U32, Blob, Str, Str],
            Self::AssemblyProcessor => &[U32],
            Self::AssemblyOs => &[U32, U32, U32],
            Self::AssemblyRef => &[U16, U16, U16, U16, U32, Blob, Str, Str, Blob],
            Self::AssemblyRefProcessor => &[U32, Index(TableId::AssemblyRef)],
            Self::AssemblyRefOs => &[U32, U32, U32, Index(TableId::AssemblyRef)],
            Self::File => &[U32, Str, Blob],
            // TypeDefId is a plain 4-byte hint into another module.
            Self::ExportedType => &[U32, U32, Str, Str, Coded(C::Implementation)],
            Self::ManifestResource => &[U32, U32, Str, Coded(C::Implementation)],
            Self::NestedClass => &[Index(TableId::TypeDef), Index(TableId::TypeDef)],
            Self::GenericParam => &[U16, U16, Coded(C::TypeOrMethodDef), Str],
            Self::MethodSpec => &[Coded(C::MethodDefOrRef), Blob],
            Self::GenericParamConstraint => {
                &[Index(TableId::GenericParam), Coded(C::TypeDefOrRef)]
            }
        }
    }
}
