use crate::arrays::datatype::{
    DataType,
    DataTypeId,
    DataTypeKind,
    DecimalTypeMeta,
    ListTypeMeta,
    MapTypeMeta,
    StructTypeMeta,
};

/// Number of decimal digits needed to hold any value of an integer type.
const fn integer_digits(id: DataTypeId) -> Option<u8> {
    Some(match id {
        DataTypeId::Int8 | DataTypeId::UInt8 => 3,
        DataTypeId::Int16 | DataTypeId::UInt16 => 5,
        DataTypeId::Int32 | DataTypeId::UInt32 => 10,
        DataTypeId::Int64 => 19,
        DataTypeId::UInt64 => 20,
        _ => return None,
    })
}

fn signed_with_width(bits: u8) -> DataType {
    match bits {
        0..=8 => DataType::int8(),
        9..=16 => DataType::int16(),
        17..=32 => DataType::int32(),
        _ => DataType::int64(),
    }
}

fn unsigned_with_width(bits: u8) -> DataType {
    match bits {
        0..=8 => DataType::uint8(),
        9..=16 => DataType::uint16(),
        17..=32 => DataType::uint32(),
        _ => DataType::uint64(),
    }
}

fn float_with_width(bits: u8) -> DataType {
    match bits {
        0..=16 => DataType::float16(),
        17..=32 => DataType::float32(),
        _ => DataType::float64(),
    }
}

/// Find the narrowest type both `a` and `b` can be losslessly (or with a
/// documented narrowing) represented as.
///
/// The result is nullable if either input is nullable. Returns None if the
/// types can't be unified.
///
/// - Null unifies with anything.
/// - Integers widen. Mixing signed and unsigned widens to the next signed
///   width, saturating at Int64.
/// - Integers and floats unify to Float64.
/// - Integers and decimals unify to a decimal wide enough for the integer.
/// - Decimals take the max precision and scale.
/// - Timestamps must agree on timezone.
/// - Intervals take the finer unit.
/// - Lists, structs and maps unify element-wise.
pub fn common_supertype(a: &DataType, b: &DataType) -> Option<DataType> {
    let nullable = a.nullable || b.nullable;

    if a.is_null() {
        return Some(b.clone().with_nullable(true));
    }
    if b.is_null() {
        return Some(a.clone().with_nullable(true));
    }

    let unified = match (&a.kind, &b.kind) {
        _ if a.is_integer() && b.is_integer() => {
            let (a_bits, b_bits) = (a.bit_width()?, b.bit_width()?);
            match (a.is_signed_integer(), b.is_signed_integer()) {
                (true, true) => signed_with_width(a_bits.max(b_bits)),
                (false, false) => unsigned_with_width(a_bits.max(b_bits)),
                (true, false) => signed_with_width(a_bits.max(b_bits.saturating_mul(2))),
                (false, true) => signed_with_width(b_bits.max(a_bits.saturating_mul(2))),
            }
        }
        _ if a.is_floating() && b.is_floating() => {
            float_with_width(a.bit_width()?.max(b.bit_width()?))
        }
        _ if (a.is_integer() && b.is_floating()) || (a.is_floating() && b.is_integer()) => {
            DataType::float64()
        }
        (DataTypeKind::Decimal(m1), DataTypeKind::Decimal(m2)) => DataType::decimal(
            m1.precision.max(m2.precision),
            m1.scale.max(m2.scale),
        ),
        (DataTypeKind::Decimal(m), _) if b.is_integer() => {
            decimal_with_integer(*m, b.datatype_id())?
        }
        (_, DataTypeKind::Decimal(m)) if a.is_integer() => {
            decimal_with_integer(*m, a.datatype_id())?
        }
        (DataTypeKind::Decimal(_), _) if b.is_floating() => DataType::float64(),
        (_, DataTypeKind::Decimal(_)) if a.is_floating() => DataType::float64(),
        (DataTypeKind::Timestamp(m1), DataTypeKind::Timestamp(m2)) => {
            if m1.timezone != m2.timezone {
                return None;
            }
            a.clone()
        }
        (DataTypeKind::Interval(u1), DataTypeKind::Interval(u2)) => {
            DataType::interval(u1.finest(*u2))
        }
        (DataTypeKind::List(m1), DataTypeKind::List(m2)) => {
            let elem = common_supertype(&m1.datatype, &m2.datatype)?;
            DataType::new(DataTypeKind::List(ListTypeMeta {
                datatype: Box::new(elem),
            }))
        }
        (DataTypeKind::Struct(m1), DataTypeKind::Struct(m2)) => {
            if m1.fields.len() != m2.fields.len() {
                return None;
            }
            let fields = m1
                .fields
                .iter()
                .zip(&m2.fields)
                .map(|((n1, t1), (n2, t2))| {
                    if n1 != n2 {
                        return None;
                    }
                    Some((n1.clone(), common_supertype(t1, t2)?))
                })
                .collect::<Option<Vec<_>>>()?;
            DataType::new(DataTypeKind::Struct(StructTypeMeta { fields }))
        }
        (DataTypeKind::Map(m1), DataTypeKind::Map(m2)) => {
            DataType::new(DataTypeKind::Map(MapTypeMeta {
                key: Box::new(common_supertype(&m1.key, &m2.key)?),
                value: Box::new(common_supertype(&m1.value, &m2.value)?),
            }))
        }
        (k1, k2) if k1 == k2 => a.clone(),
        _ => return None,
    };

    Some(unified.with_nullable(nullable))
}

fn decimal_with_integer(meta: DecimalTypeMeta, int: DataTypeId) -> Option<DataType> {
    let digits = integer_digits(int)?;
    let precision = meta
        .precision
        .max(digits.saturating_add(meta.scale))
        .min(DecimalTypeMeta::MAX_PRECISION);
    Some(DataType::decimal(precision, meta.scale))
}

/// If values of the two types can be compared with each other.
pub fn is_comparable(a: &DataType, b: &DataType) -> bool {
    if a.is_null() || b.is_null() {
        return true;
    }
    // Differing timezones still describe instants, comparing is fine.
    if a.datatype_id() == DataTypeId::Timestamp && b.datatype_id() == DataTypeId::Timestamp {
        return true;
    }
    common_supertype(a, b).is_some()
}
