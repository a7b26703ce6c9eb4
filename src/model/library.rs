//! Id-indexed arena owning every declaration of one native library.
//!
//! Types refer to declarations by typed id rather than by pointer, which keeps
//! the model serializable and lets cyclic graphs (a class holding a pointer to
//! itself) be expressed without shared ownership.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::logging::error;

use super::decls::{Class, ClassTemplate, Enumeration, Field, TranslationUnit, TypedefDecl};
use super::error::ModelError;
use super::types::{FunctionType, Primitive, QualifiedType, Type};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Index of a [`Class`] in a [`Library`].
    ClassId,
    "class"
);
define_id!(
    /// Index of an [`Enumeration`] in a [`Library`].
    EnumId,
    "enum"
);
define_id!(
    /// Index of a [`TypedefDecl`] in a [`Library`].
    TypedefId,
    "typedef"
);
define_id!(
    /// Index of a [`ClassTemplate`] in a [`Library`].
    TemplateId,
    "template"
);

/// A field of a class as seen through inheritance flattening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveField {
    /// Class that declares the field.
    pub owner: ClassId,
    pub field: Field,
    /// Byte offset from the start of the flattened class.
    pub offset: u32,
}

/// Arena of declarations addressed by typed ids.
///
/// Declarations are reachable only through `add_*` and the id lookups. Every
/// mutating path clears the flattened-field cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Library {
    #[serde(default)]
    classes: Vec<Class>,
    #[serde(default)]
    enums: Vec<Enumeration>,
    #[serde(default)]
    typedefs: Vec<TypedefDecl>,
    #[serde(default)]
    templates: Vec<ClassTemplate>,
    #[serde(default)]
    units: Vec<TranslationUnit>,
    #[serde(skip)]
    field_cache: RefCell<HashMap<ClassId, Rc<[EffectiveField]>>>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a model serialized as JSON.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match Self::from_json(&content) {
            Ok(library) => Ok(library),
            Err(e) => {
                error!(path = %path.display(), error = %e, "invalid declaration model");
                Err(e)
            }
        }
    }

    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn add_class(&mut self, class: Class) -> ClassId {
        self.field_cache.get_mut().clear();
        self.classes.push(class);
        ClassId(self.classes.len().saturating_sub(1) as u32)
    }

    pub fn add_enum(&mut self, enumeration: Enumeration) -> EnumId {
        self.enums.push(enumeration);
        EnumId(self.enums.len().saturating_sub(1) as u32)
    }

    pub fn add_typedef(&mut self, typedef: TypedefDecl) -> TypedefId {
        self.typedefs.push(typedef);
        TypedefId(self.typedefs.len().saturating_sub(1) as u32)
    }

    pub fn add_template(&mut self, template: ClassTemplate) -> TemplateId {
        self.templates.push(template);
        TemplateId(self.templates.len().saturating_sub(1) as u32)
    }

    pub fn add_unit(&mut self, unit: TranslationUnit) {
        self.units.push(unit);
    }

    pub fn units(&self) -> &[TranslationUnit] {
        &self.units
    }

    pub fn class(&self, id: ClassId) -> Result<&Class, ModelError> {
        self.classes
            .get(id.index())
            .ok_or(ModelError::MissingClass(id))
    }

    pub fn class_mut(&mut self, id: ClassId) -> Result<&mut Class, ModelError> {
        self.field_cache.get_mut().clear();
        self.classes
            .get_mut(id.index())
            .ok_or(ModelError::MissingClass(id))
    }

    pub fn enumeration(&self, id: EnumId) -> Result<&Enumeration, ModelError> {
        self.enums.get(id.index()).ok_or(ModelError::MissingEnum(id))
    }

    pub fn typedef(&self, id: TypedefId) -> Result<&TypedefDecl, ModelError> {
        self.typedefs
            .get(id.index())
            .ok_or(ModelError::MissingTypedef(id))
    }

    pub fn template(&self, id: TemplateId) -> Result<&ClassTemplate, ModelError> {
        self.templates
            .get(id.index())
            .ok_or(ModelError::MissingTemplate(id))
    }

    /// Strip every typedef layer off a type.
    pub fn desugar<'a>(&'a self, mut ty: &'a Type) -> Result<&'a Type, ModelError> {
        // A typedef chain longer than the typedef table must loop.
        for _ in 0..=self.typedefs.len() {
            match ty {
                Type::Typedef(id) => ty = &self.typedef(*id)?.ty.ty,
                other => return Ok(other),
            }
        }
        Err(ModelError::CyclicTypedef(format!("{ty:?}")))
    }

    pub fn as_primitive(&self, ty: &Type) -> Result<Option<Primitive>, ModelError> {
        Ok(match self.desugar(ty)? {
            Type::Primitive(kind) => Some(*kind),
            _ => None,
        })
    }

    pub fn is_primitive(&self, ty: &Type, kind: Primitive) -> Result<bool, ModelError> {
        Ok(self.as_primitive(ty)? == Some(kind))
    }

    /// Whether the type is a pointer or reference once typedefs are removed.
    pub fn is_pointer(&self, ty: &Type) -> Result<bool, ModelError> {
        Ok(self.desugar(ty)?.is_pointer())
    }

    pub fn pointee<'a>(&'a self, ty: &'a Type) -> Result<Option<&'a QualifiedType>, ModelError> {
        Ok(self.desugar(ty)?.pointee())
    }

    /// `T*` where `T` desugars to the given primitive.
    pub fn is_pointer_to_primitive(&self, ty: &Type, kind: Primitive) -> Result<bool, ModelError> {
        match self.pointee(ty)? {
            Some(pointee) => self.is_primitive(&pointee.ty, kind),
            None => Ok(false),
        }
    }

    /// Function type behind a function pointer, if the type is one.
    pub fn pointee_function<'a>(
        &'a self,
        ty: &'a Type,
    ) -> Result<Option<&'a FunctionType>, ModelError> {
        let Some(pointee) = self.pointee(ty)? else {
            return Ok(None);
        };
        Ok(match self.desugar(&pointee.ty)? {
            Type::Function(function) => Some(function),
            _ => None,
        })
    }

    /// Class named by a tag or template specialization, after desugaring.
    pub fn tag_class(&self, ty: &Type) -> Result<Option<(ClassId, &Class)>, ModelError> {
        match self.desugar(ty)? {
            Type::Tag(id) => Ok(Some((*id, self.class(*id)?))),
            Type::TemplateSpecialization { template, .. } => {
                let id = self.template(*template)?.templated_class;
                Ok(Some((id, self.class(id)?)))
            }
            _ => Ok(None),
        }
    }

    /// Typedef that names the given function-pointer type as a delegate.
    ///
    /// A typedef matches when it aliases a function pointer directly, when it
    /// is the pointee of the pointer, or when its aliased type is structurally
    /// equal to the queried one.
    pub fn delegate_for(&self, ty: &Type) -> Result<Option<TypedefId>, ModelError> {
        match ty {
            Type::Typedef(id) => {
                let aliased = &self.typedef(*id)?.ty.ty;
                if self.pointee_function(aliased)?.is_some() {
                    return Ok(Some(*id));
                }
                if matches!(self.desugar(aliased)?, Type::Function(_)) {
                    return Ok(Some(*id));
                }
                self.delegate_for(aliased)
            }
            Type::Pointer { pointee, .. } => {
                if let Type::Typedef(id) = &pointee.ty
                    && matches!(self.desugar(&pointee.ty)?, Type::Function(_))
                {
                    return Ok(Some(*id));
                }
                for (index, typedef) in self.typedefs.iter().enumerate() {
                    if typedef.ty.ty == *ty {
                        return Ok(Some(TypedefId(index as u32)));
                    }
                }
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    /// Fields a value-type class carries once its bases are flattened.
    ///
    /// Non-ignored bases are visited depth-first in declaration order, then
    /// the class's own non-ignored fields follow. The result matches native
    /// layout order and is computed once per class.
    pub fn effective_fields(&self, id: ClassId) -> Result<Rc<[EffectiveField]>, ModelError> {
        if let Some(cached) = self.field_cache.borrow().get(&id) {
            return Ok(Rc::clone(cached));
        }

        let mut fields = Vec::new();
        let mut visiting = Vec::new();
        self.collect_fields(id, 0, &mut visiting, &mut fields)?;
        let fields: Rc<[EffectiveField]> = fields.into();
        self.field_cache
            .borrow_mut()
            .insert(id, Rc::clone(&fields));
        Ok(fields)
    }

    fn collect_fields(
        &self,
        id: ClassId,
        base_offset: u32,
        visiting: &mut Vec<ClassId>,
        out: &mut Vec<EffectiveField>,
    ) -> Result<(), ModelError> {
        let class = self.class(id)?;
        if visiting.contains(&id) {
            return Err(ModelError::CyclicInheritance {
                class: class.native_qualified_name(),
            });
        }
        visiting.push(id);

        for base in &class.bases {
            let Some((base_id, base_class)) = self.tag_class(&base.ty)? else {
                continue;
            };
            if base_class.ignore {
                continue;
            }
            self.collect_fields(base_id, base_offset + base.offset, visiting, out)?;
        }

        for field in class.fields.iter().filter(|f| !f.ignore) {
            out.push(EffectiveField {
                owner: id,
                field: field.clone(),
                offset: base_offset + field.offset,
            });
        }

        visiting.pop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::decls::{BaseClassSpecifier, ClassKind};

    fn int() -> Type {
        Type::Primitive(Primitive::Int32)
    }

    #[test]
    fn test_desugar_walks_typedef_chain() -> Result<(), ModelError> {
        let mut lib = Library::new();
        let inner = lib.add_typedef(TypedefDecl::new("inner_t", int()));
        let outer = lib.add_typedef(TypedefDecl::new("outer_t", Type::Typedef(inner)));
        assert_eq!(lib.desugar(&Type::Typedef(outer))?, &int());
        assert!(lib.is_primitive(&Type::Typedef(outer), Primitive::Int32)?);
        Ok(())
    }

    #[test]
    fn test_missing_ids_are_errors() {
        let lib = Library::new();
        assert!(matches!(
            lib.class(ClassId(3)),
            Err(ModelError::MissingClass(ClassId(3)))
        ));
        assert!(lib.desugar(&Type::Typedef(TypedefId(0))).is_err());
    }

    #[test]
    fn test_effective_fields_depth_first() -> Result<(), ModelError> {
        let mut lib = Library::new();

        let mut root = Class::new("Root", ClassKind::ValueType, 4);
        root.fields.push(Field::new("a", int(), 0));
        let root = lib.add_class(root);

        let mut mid = Class::new("Mid", ClassKind::ValueType, 12);
        mid.bases.push(BaseClassSpecifier {
            ty: Type::Tag(root),
            offset: 0,
            is_virtual: false,
        });
        let mut hidden = Field::new("hidden", int(), 4);
        hidden.ignore = true;
        mid.fields.push(hidden);
        mid.fields.push(Field::new("b", int(), 8));
        let mid = lib.add_class(mid);

        let mut leaf = Class::new("Leaf", ClassKind::ValueType, 16);
        leaf.bases.push(BaseClassSpecifier {
            ty: Type::Tag(mid),
            offset: 0,
            is_virtual: false,
        });
        leaf.fields.push(Field::new("c", int(), 12));
        let leaf = lib.add_class(leaf);

        let fields = lib.effective_fields(leaf)?;
        let names: Vec<_> = fields.iter().map(|f| f.field.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        let offsets: Vec<_> = fields.iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![0, 8, 12]);

        // Second call is served from the cache.
        let again = lib.effective_fields(leaf)?;
        assert!(Rc::ptr_eq(&fields, &again));
        Ok(())
    }

    #[test]
    fn test_class_mut_invalidates_flattened_fields() -> Result<(), ModelError> {
        let mut lib = Library::new();
        let mut point = Class::new("Point", ClassKind::ValueType, 4);
        point.fields.push(Field::new("x", int(), 0));
        let point = lib.add_class(point);
        assert_eq!(lib.effective_fields(point)?.len(), 1);

        lib.class_mut(point)?.fields.push(Field::new("y", int(), 4));
        let names: Vec<_> = lib
            .effective_fields(point)?
            .iter()
            .map(|f| f.field.name.clone())
            .collect();
        assert_eq!(names, vec!["x", "y"]);
        Ok(())
    }

    #[test]
    fn test_effective_fields_detects_cycles() {
        let mut lib = Library::new();
        let mut a = Class::new("A", ClassKind::ValueType, 4);
        a.bases.push(BaseClassSpecifier {
            ty: Type::Tag(ClassId(0)),
            offset: 0,
            is_virtual: false,
        });
        let a = lib.add_class(a);
        assert!(matches!(
            lib.effective_fields(a),
            Err(ModelError::CyclicInheritance { .. })
        ));
    }

    #[test]
    fn test_delegate_lookup() -> Result<(), ModelError> {
        let mut lib = Library::new();
        let callback = Type::pointer_to(Type::Function(FunctionType {
            return_type: Box::new(QualifiedType::new(Type::Primitive(Primitive::Void))),
            params: vec![QualifiedType::new(int())],
            calling_convention: Default::default(),
        }));
        let id = lib.add_typedef(TypedefDecl::new("Callback", callback.clone()));
        assert_eq!(lib.delegate_for(&Type::Typedef(id))?, Some(id));
        assert_eq!(lib.delegate_for(&callback)?, Some(id));
        assert_eq!(lib.delegate_for(&int())?, None);
        Ok(())
    }
}
