//! Package → class → member containment tree.
//!
//! Descriptors live in flat arenas owned by [`JitModel`]. Parent links are
//! plain indices, so walking up from a member to its package never needs a
//! shared or cyclic pointer.

use super::compilation::{CompilationRecord, CompileKey};
use crate::parser::signature::{MemberSignature, Modifier};
use crate::utils::error::ModelError;
use log::debug;
use std::collections::HashMap;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(usize);

        impl $name {
            pub fn from_index(index: usize) -> Self {
                Self(index)
            }

            pub fn index(&self) -> usize {
                self.0
            }
        }
    };
}

arena_id!(
    /// Index of a package in the model
    PackageId
);
arena_id!(
    /// Index of a class in the model
    ClassId
);
arena_id!(
    /// Index of a member in the model
    MemberId
);

#[derive(Debug, Clone)]
pub struct PackageDescriptor {
    pub id: PackageId,
    /// Dotted name; the default package is the empty string
    pub name: String,
    pub parent: Option<PackageId>,
    pub child_packages: Vec<PackageId>,
    pub classes: Vec<ClassId>,
}

#[derive(Debug, Clone)]
pub struct ClassDescriptor {
    pub id: ClassId,
    /// Fully-qualified dotted name
    pub name: String,
    pub package: PackageId,
    pub members: Vec<MemberId>,
}

impl ClassDescriptor {
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone)]
pub struct MemberDescriptor {
    pub id: MemberId,
    pub class: ClassId,
    pub signature: MemberSignature,
    pub modifiers: Vec<Modifier>,
    pub varargs: bool,
    compilations: Vec<CompilationRecord>,
    selected: Option<usize>,
}

impl MemberDescriptor {
    pub fn compilations(&self) -> &[CompilationRecord] {
        &self.compilations
    }

    pub fn compilation(&self, index: usize) -> Option<&CompilationRecord> {
        self.compilations.get(index)
    }

    pub(crate) fn compilation_mut(&mut self, index: usize) -> Option<&mut CompilationRecord> {
        self.compilations.get_mut(index)
    }

    pub fn last_compilation(&self) -> Option<&CompilationRecord> {
        self.compilations.last()
    }

    /// Any compilation reached INSTALLED
    pub fn is_compiled(&self) -> bool {
        self.compilations
            .iter()
            .any(|c| c.state() == super::CompilationState::Installed)
    }

    /// Choose the compilation used by queries
    ///
    /// Selection is always explicit; the model never picks one itself.
    pub fn select_compilation(&mut self, index: usize) -> Result<(), ModelError> {
        if index >= self.compilations.len() {
            return Err(ModelError::InvalidSelection {
                member: self.signature.canonical(),
                index,
                count: self.compilations.len(),
            });
        }
        self.selected = Some(index);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_compilation(&self) -> Option<&CompilationRecord> {
        self.selected.and_then(|i| self.compilations.get(i))
    }

    /// Append a new QUEUED record and return its index
    pub(crate) fn push_compilation(&mut self, key: &CompileKey) -> usize {
        let index = self.compilations.len();
        self.compilations
            .push(CompilationRecord::queued(self.id, index, key));
        index
    }

    /// Fill modifiers the first time they become known
    pub fn set_modifiers_if_unknown(&mut self, modifiers: Vec<Modifier>, varargs: bool) {
        if self.modifiers.is_empty() {
            self.modifiers = modifiers;
            self.varargs = varargs;
        }
    }
}

/// The whole compilation event model for one log
#[derive(Debug, Default)]
pub struct JitModel {
    packages: Vec<PackageDescriptor>,
    classes: Vec<ClassDescriptor>,
    members: Vec<MemberDescriptor>,
    package_index: HashMap<String, PackageId>,
    class_index: HashMap<String, ClassId>,
    member_index: HashMap<MemberSignature, MemberId>,
    pub(crate) compile_ids: HashMap<CompileKey, (MemberId, usize)>,
}

impl JitModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find or create the member, creating its class and packages on the way
    pub fn get_or_create_member(&mut self, signature: &MemberSignature) -> MemberId {
        if let Some(id) = self.member_index.get(signature) {
            return *id;
        }
        let class = self.get_or_create_class(&signature.class_name);
        let id = MemberId(self.members.len());
        self.members.push(MemberDescriptor {
            id,
            class,
            signature: signature.clone(),
            modifiers: Vec::new(),
            varargs: false,
            compilations: Vec::new(),
            selected: None,
        });
        self.classes[class.0].members.push(id);
        self.member_index.insert(signature.clone(), id);
        id
    }

    /// Find or create a class by fully-qualified dotted name
    pub fn get_or_create_class(&mut self, class_name: &str) -> ClassId {
        if let Some(id) = self.class_index.get(class_name) {
            return *id;
        }
        let package_name = match class_name.rfind('.') {
            Some(idx) => &class_name[..idx],
            None => "",
        };
        let package = self.get_or_create_package(package_name);
        let id = ClassId(self.classes.len());
        self.classes.push(ClassDescriptor {
            id,
            name: class_name.to_string(),
            package,
            members: Vec::new(),
        });
        self.packages[package.0].classes.push(id);
        self.class_index.insert(class_name.to_string(), id);
        debug!("New class {}", class_name);
        id
    }

    /// Find or create a package, creating parent packages as needed
    pub fn get_or_create_package(&mut self, package_name: &str) -> PackageId {
        if let Some(id) = self.package_index.get(package_name) {
            return *id;
        }
        let parent = match package_name.rfind('.') {
            Some(idx) => Some(self.get_or_create_package(&package_name[..idx])),
            None => None,
        };
        let id = PackageId(self.packages.len());
        self.packages.push(PackageDescriptor {
            id,
            name: package_name.to_string(),
            parent,
            child_packages: Vec::new(),
            classes: Vec::new(),
        });
        if let Some(parent) = parent {
            self.packages[parent.0].child_packages.push(id);
        }
        self.package_index.insert(package_name.to_string(), id);
        id
    }

    pub fn member(&self, id: MemberId) -> &MemberDescriptor {
        &self.members[id.0]
    }

    pub fn member_mut(&mut self, id: MemberId) -> &mut MemberDescriptor {
        &mut self.members[id.0]
    }

    pub fn class(&self, id: ClassId) -> &ClassDescriptor {
        &self.classes[id.0]
    }

    pub fn package(&self, id: PackageId) -> &PackageDescriptor {
        &self.packages[id.0]
    }

    /// Class owning a member
    pub fn class_of(&self, member: MemberId) -> &ClassDescriptor {
        self.class(self.member(member).class)
    }

    /// Package owning a member's class
    pub fn package_of(&self, member: MemberId) -> &PackageDescriptor {
        self.package(self.class_of(member).package)
    }

    pub fn find_member(&self, signature: &MemberSignature) -> Option<MemberId> {
        self.member_index.get(signature).copied()
    }

    /// Look up a member by canonical text `pkg.Class member (desc)ret`
    pub fn find_member_by_canonical(&self, text: &str) -> Option<MemberId> {
        MemberSignature::from_canonical(text)
            .ok()
            .and_then(|sig| self.find_member(&sig))
    }

    /// All members of a class with the given name, in insertion order
    pub fn find_members_by_name(&self, class_name: &str, member_name: &str) -> Vec<MemberId> {
        self.find_class(class_name)
            .map(|class| {
                self.class(class)
                    .members
                    .iter()
                    .copied()
                    .filter(|m| self.member(*m).signature.member_name == member_name)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn find_class(&self, class_name: &str) -> Option<ClassId> {
        self.class_index.get(class_name).copied()
    }

    pub fn find_package(&self, package_name: &str) -> Option<PackageId> {
        self.package_index.get(package_name).copied()
    }

    /// Locate the record created for a compile id
    pub fn find_compilation(&self, key: &CompileKey) -> Option<&CompilationRecord> {
        let (member, index) = self.compile_ids.get(key)?;
        self.member(*member).compilation(*index)
    }

    pub fn members(&self) -> impl Iterator<Item = &MemberDescriptor> {
        self.members.iter()
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.classes.iter()
    }

    pub fn packages(&self) -> impl Iterator<Item = &PackageDescriptor> {
        self.packages.iter()
    }

    /// Top-level packages (no parent), in creation order
    pub fn root_packages(&self) -> impl Iterator<Item = &PackageDescriptor> {
        self.packages.iter().filter(|p| p.parent.is_none())
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn compilation_count(&self) -> usize {
        self.members.iter().map(|m| m.compilations.len()).sum()
    }

    /// Every record, member by member, in queue order within a member
    pub fn compilations(&self) -> impl Iterator<Item = &CompilationRecord> {
        self.members.iter().flat_map(|m| m.compilations.iter())
    }
}
