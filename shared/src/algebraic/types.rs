use crate::error::{Result, SyncError};

/// Index of a slot in a `Typespace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef(pub u32);

/// Recursive description of a value's wire shape.
#[derive(Debug, Clone, PartialEq)]
pub enum AlgebraicType {
    /// Indirection through a `Typespace` slot. Allows self-referential types.
    Ref(TypeRef),
    Sum(SumType),
    Product(ProductType),
    /// Homogeneous sequence. `Array(U8)` is encoded as a byte array.
    Array(Box<AlgebraicType>),
    String,
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    I128,
    U128,
    I256,
    U256,
    F32,
    F64,
}

impl AlgebraicType {
    /// The empty product.
    pub fn unit() -> Self {
        Self::Product(ProductType::default())
    }

    pub fn bytes() -> Self {
        Self::Array(Box::new(Self::U8))
    }

    pub fn array(elem: AlgebraicType) -> Self {
        Self::Array(Box::new(elem))
    }

    /// `some(inner) | none(unit)`, encoded with the compact presence tag.
    pub fn option(inner: AlgebraicType) -> Self {
        Self::Sum(SumType::new(vec![
            SumTypeVariant::new("some", inner),
            SumTypeVariant::new("none", Self::unit()),
        ]))
    }

    pub fn product<N: Into<String>>(elements: impl IntoIterator<Item = (N, AlgebraicType)>) -> Self {
        Self::Product(ProductType::new(elements))
    }

    pub fn sum<N: Into<String>>(variants: impl IntoIterator<Item = (N, AlgebraicType)>) -> Self {
        Self::Sum(SumType::new(
            variants
                .into_iter()
                .map(|(name, ty)| SumTypeVariant::new(name, ty))
                .collect(),
        ))
    }

    pub fn identity() -> Self {
        Self::product([(SpecialKind::Identity.field_name(), Self::U256)])
    }

    pub fn connection_id() -> Self {
        Self::product([(SpecialKind::ConnectionId.field_name(), Self::U128)])
    }

    pub fn timestamp() -> Self {
        Self::product([(SpecialKind::Timestamp.field_name(), Self::I64)])
    }

    pub fn time_duration() -> Self {
        Self::product([(SpecialKind::TimeDuration.field_name(), Self::I64)])
    }

    pub fn is_option(&self) -> bool {
        matches!(self, Self::Sum(sum) if sum.is_option())
    }

    /// Short name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Ref(_) => "ref",
            Self::Sum(_) => "sum",
            Self::Product(_) => "product",
            Self::Array(_) => "array",
            Self::String => "string",
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::I128 => "i128",
            Self::U128 => "u128",
            Self::I256 => "i256",
            Self::U256 => "u256",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

/// One named field of a product type.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductTypeElement {
    pub name: String,
    pub algebraic_type: AlgebraicType,
}

/// Ordered named fields. Field identity on the wire is purely positional.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductType {
    pub elements: Vec<ProductTypeElement>,
}

impl ProductType {
    pub fn new<N: Into<String>>(elements: impl IntoIterator<Item = (N, AlgebraicType)>) -> Self {
        Self {
            elements: elements
                .into_iter()
                .map(|(name, algebraic_type)| ProductTypeElement {
                    name: name.into(),
                    algebraic_type,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Position of the field called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.elements.iter().position(|e| e.name == name)
    }

    /// Recognises the single-field wrapper products with dedicated meaning.
    pub fn special_kind(&self) -> Option<SpecialKind> {
        match self.elements.as_slice() {
            [only] => SpecialKind::from_field_name(&only.name),
            _ => None,
        }
    }
}

/// Wrapper products that stand for a scalar with domain meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialKind {
    Identity,
    ConnectionId,
    Timestamp,
    TimeDuration,
}

impl SpecialKind {
    pub fn field_name(&self) -> &'static str {
        match self {
            SpecialKind::Identity => "__identity__",
            SpecialKind::ConnectionId => "__connection_id__",
            SpecialKind::Timestamp => "__timestamp_micros_since_unix_epoch__",
            SpecialKind::TimeDuration => "__time_duration_micros__",
        }
    }

    pub fn from_field_name(name: &str) -> Option<Self> {
        match name {
            "__identity__" => Some(SpecialKind::Identity),
            "__connection_id__" => Some(SpecialKind::ConnectionId),
            "__timestamp_micros_since_unix_epoch__" => Some(SpecialKind::Timestamp),
            "__time_duration_micros__" => Some(SpecialKind::TimeDuration),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SumTypeVariant {
    pub name: String,
    pub algebraic_type: AlgebraicType,
}

impl SumTypeVariant {
    pub fn new(name: impl Into<String>, algebraic_type: AlgebraicType) -> Self {
        Self {
            name: name.into(),
            algebraic_type,
        }
    }
}

/// Tagged union; the tag is the variant's position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SumType {
    pub variants: Vec<SumTypeVariant>,
}

impl SumType {
    pub fn new(variants: Vec<SumTypeVariant>) -> Self {
        Self { variants }
    }

    /// Exactly two variants named `some` and `none`, in that order.
    pub fn is_option(&self) -> bool {
        matches!(self.variants.as_slice(), [some, none] if some.name == "some" && none.name == "none")
    }

    pub fn tag_of(&self, name: &str) -> Option<u8> {
        self.variants
            .iter()
            .position(|v| v.name == name)
            .map(|i| i as u8)
    }
}

/// Arena of type slots addressed by `TypeRef`.
///
/// Self-referential types are built in two phases: `reserve` a slot, use
/// its `TypeRef` inside the definition, then `define` the slot.
#[derive(Debug, Clone, Default)]
pub struct Typespace {
    types: Vec<Option<AlgebraicType>>,
}

impl Typespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Allocate an empty slot.
    pub fn reserve(&mut self) -> TypeRef {
        self.types.push(None);
        TypeRef(self.types.len() as u32 - 1)
    }

    /// Populate a previously reserved slot.
    pub fn define(&mut self, slot: TypeRef, ty: AlgebraicType) -> Result<()> {
        let entry = self
            .types
            .get_mut(slot.0 as usize)
            .ok_or(SyncError::UnresolvedRef(slot.0))?;
        *entry = Some(ty);
        Ok(())
    }

    /// Reserve and define in one step.
    pub fn add(&mut self, ty: AlgebraicType) -> TypeRef {
        self.types.push(Some(ty));
        TypeRef(self.types.len() as u32 - 1)
    }

    pub fn get(&self, slot: TypeRef) -> Result<&AlgebraicType> {
        self.types
            .get(slot.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(SyncError::UnresolvedRef(slot.0))
    }

    /// Follow `Ref` indirections until a concrete type is reached.
    ///
    /// A chain longer than the arena can only be a cycle of bare refs, which
    /// is rejected instead of looping.
    pub fn resolve<'a>(&'a self, mut ty: &'a AlgebraicType) -> Result<&'a AlgebraicType> {
        let mut hops = 0usize;
        while let AlgebraicType::Ref(slot) = ty {
            if hops > self.types.len() {
                return Err(SyncError::UnresolvedRef(slot.0));
            }
            ty = self.get(*slot)?;
            hops += 1;
        }
        Ok(ty)
    }
}
