//! The closed catalogs of evaluation and validation functions.

use std::fmt;
use std::str::FromStr;

use crate::contract::{Bindings, Contract};
use crate::error::EngineError;
use crate::value::ValueType;

/// Functions that compute a variable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluationKind {
    GetProvidedString,
    GetProvidedInteger,
    GetProvidedFile,
    FindFilesInDirByPattern,
    GetFirstFileFromFileList,
    MergeFileLists,
    GetStringByXpath,
}

impl EvaluationKind {
    pub const ALL: [EvaluationKind; 7] = [
        EvaluationKind::GetProvidedString,
        EvaluationKind::GetProvidedInteger,
        EvaluationKind::GetProvidedFile,
        EvaluationKind::FindFilesInDirByPattern,
        EvaluationKind::GetFirstFileFromFileList,
        EvaluationKind::MergeFileLists,
        EvaluationKind::GetStringByXpath,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EvaluationKind::GetProvidedString => "getProvidedString",
            EvaluationKind::GetProvidedInteger => "getProvidedInteger",
            EvaluationKind::GetProvidedFile => "getProvidedFile",
            EvaluationKind::FindFilesInDirByPattern => "findFilesInDirByPattern",
            EvaluationKind::GetFirstFileFromFileList => "getFirstFileFromFileList",
            EvaluationKind::MergeFileLists => "mergeFileLists",
            EvaluationKind::GetStringByXpath => "getStringByXpath",
        }
    }

    pub fn contract(self) -> Contract {
        match self {
            EvaluationKind::GetProvidedString => Contract::new()
                .returns(ValueType::String)
                .required("string_id", ValueType::String),
            EvaluationKind::GetProvidedInteger => Contract::new()
                .returns(ValueType::Integer)
                .required("int_id", ValueType::String),
            EvaluationKind::GetProvidedFile => Contract::new()
                .returns(ValueType::File)
                .required("file_id", ValueType::String),
            EvaluationKind::FindFilesInDirByPattern => Contract::new()
                .returns(ValueType::FileList)
                .required("dir", ValueType::File)
                .pattern("pattern"),
            EvaluationKind::GetFirstFileFromFileList => Contract::new()
                .returns(ValueType::File)
                .required("files", ValueType::FileList),
            EvaluationKind::MergeFileLists => Contract::new()
                .returns(ValueType::FileList)
                .value("files", ValueType::FileList, 1, None),
            EvaluationKind::GetStringByXpath => Contract::new()
                .returns(ValueType::String)
                .required("xml_file", ValueType::File)
                .required("xpath", ValueType::String),
        }
    }

    /// Type of the value the function produces.
    pub fn return_type(self) -> ValueType {
        match self {
            EvaluationKind::GetProvidedString | EvaluationKind::GetStringByXpath => {
                ValueType::String
            }
            EvaluationKind::GetProvidedInteger => ValueType::Integer,
            EvaluationKind::GetProvidedFile | EvaluationKind::GetFirstFileFromFileList => {
                ValueType::File
            }
            EvaluationKind::FindFilesInDirByPattern | EvaluationKind::MergeFileLists => {
                ValueType::FileList
            }
        }
    }
}

/// Functions that check the package and produce problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationKind {
    CheckFileIsDir,
    CheckFilelistExactSize,
    CheckAllFilenamesMatch,
    CheckNoOtherFilesInDir,
    CheckAllFilesInUtf8,
    CheckXmlIsWellFormed,
    CheckMetadataProfile,
    CheckBinaryFilesByProfile,
}

impl ValidationKind {
    pub const ALL: [ValidationKind; 8] = [
        ValidationKind::CheckFileIsDir,
        ValidationKind::CheckFilelistExactSize,
        ValidationKind::CheckAllFilenamesMatch,
        ValidationKind::CheckNoOtherFilesInDir,
        ValidationKind::CheckAllFilesInUtf8,
        ValidationKind::CheckXmlIsWellFormed,
        ValidationKind::CheckMetadataProfile,
        ValidationKind::CheckBinaryFilesByProfile,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ValidationKind::CheckFileIsDir => "checkFileIsDir",
            ValidationKind::CheckFilelistExactSize => "checkFilelistExactSize",
            ValidationKind::CheckAllFilenamesMatch => "checkAllFilenamesMatch",
            ValidationKind::CheckNoOtherFilesInDir => "checkNoOtherFilesInDir",
            ValidationKind::CheckAllFilesInUtf8 => "checkAllFilesInUtf8",
            ValidationKind::CheckXmlIsWellFormed => "checkXmlIsWellFormed",
            ValidationKind::CheckMetadataProfile => "checkMetadataProfile",
            ValidationKind::CheckBinaryFilesByProfile => "checkBinaryFilesByProfile",
        }
    }

    pub fn contract(self) -> Contract {
        match self {
            ValidationKind::CheckFileIsDir => Contract::new().required("file", ValueType::File),
            ValidationKind::CheckFilelistExactSize => Contract::new()
                .required("files", ValueType::FileList)
                .required("size", ValueType::Integer)
                .value("level", ValueType::Level, 0, Some(1)),
            ValidationKind::CheckAllFilenamesMatch => Contract::new()
                .required("files", ValueType::FileList)
                .value("level", ValueType::Level, 0, Some(1))
                .pattern("pattern"),
            ValidationKind::CheckNoOtherFilesInDir => Contract::new()
                .required("dir", ValueType::File)
                .value("files", ValueType::FileList, 0, None)
                .value("level", ValueType::Level, 0, Some(1)),
            ValidationKind::CheckAllFilesInUtf8 => {
                Contract::new().required("files", ValueType::FileList)
            }
            ValidationKind::CheckXmlIsWellFormed => {
                Contract::new().required("xml_files", ValueType::FileList)
            }
            ValidationKind::CheckMetadataProfile => Contract::new()
                .required("xml_files", ValueType::FileList)
                .required("profile", ValueType::String),
            ValidationKind::CheckBinaryFilesByProfile => Contract::new()
                .required("files", ValueType::FileList)
                .required("profile", ValueType::String),
        }
    }
}

macro_rules! impl_name_traits {
    ($kind:ty) => {
        impl fmt::Display for $kind {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $kind {
            type Err = EngineError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$kind>::ALL
                    .into_iter()
                    .find(|kind| kind.name() == s)
                    .ok_or_else(|| EngineError::UnknownFunction {
                        name: s.to_string(),
                    })
            }
        }
    };
}

impl_name_traits!(EvaluationKind);
impl_name_traits!(ValidationKind);

/// An evaluation function with its bindings, as declared for a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationFunction {
    pub kind: EvaluationKind,
    pub bindings: Bindings,
}

impl EvaluationFunction {
    pub fn new(kind: EvaluationKind, bindings: Bindings) -> Self {
        Self { kind, bindings }
    }
}

/// A validation function with its bindings, as declared for a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFunction {
    pub kind: ValidationKind,
    pub bindings: Bindings,
}

impl ValidationFunction {
    pub fn new(kind: ValidationKind, bindings: Bindings) -> Self {
        Self { kind, bindings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_parsing() {
        for kind in EvaluationKind::ALL {
            assert_eq!(kind.name().parse::<EvaluationKind>().ok(), Some(kind));
            assert_eq!(kind.contract().return_type, Some(kind.return_type()));
        }
        for kind in ValidationKind::ALL {
            assert_eq!(kind.name().parse::<ValidationKind>().ok(), Some(kind));
            assert_eq!(kind.contract().return_type, None);
        }
    }

    #[test]
    fn unknown_function_name_is_an_error() {
        assert!(matches!(
            "checkEverything".parse::<ValidationKind>(),
            Err(EngineError::UnknownFunction { .. })
        ));
    }
}
