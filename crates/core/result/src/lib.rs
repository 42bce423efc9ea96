#[macro_use]
extern crate serde;

/// Result type with custom Error
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error information
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Error {
    /// Type of error and additional information
    #[serde(flatten)]
    pub error_type: ErrorType,

    /// Where this error occurred
    pub location: String,
}

/// Possible error types
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ErrorType {
    /// Referenced post, comment, user or notification does not exist
    NotFound,

    /// Actor lacks ownership of the entity they are trying to mutate
    Forbidden,

    /// Structurally disallowed request, such as blocking yourself
    InvalidOperation,

    /// A required text field was empty or otherwise unusable
    InvalidInput {
        error: String,
    },

    // ? General errors
    DatabaseError {
        operation: String,
        collection: String,
    },
    InternalError,
}

impl Error {
    /// Whether this error is of the given type, ignoring attached data
    pub fn is(&self, error_type: &ErrorType) -> bool {
        std::mem::discriminant(&self.error_type) == std::mem::discriminant(error_type)
    }
}

#[macro_export]
macro_rules! create_error {
    ( $error: ident $( $tt:tt )? ) => {
        $crate::Error {
            error_type: $crate::ErrorType::$error $( $tt )?,
            location: format!("{}:{}:{}", file!(), line!(), column!()),
        }
    };
}

#[macro_export]
macro_rules! create_database_error {
    ( $operation: expr, $collection: expr ) => {
        create_error!(DatabaseError {
            operation: $operation.to_string(),
            collection: $collection.to_string()
        })
    };
}

#[macro_export]
#[cfg(debug_assertions)]
macro_rules! query {
    ( $self: ident, $type: ident, $collection: expr, $($rest:expr),+ ) => {
        Ok($self.$type($collection, $($rest),+).await.unwrap())
    };
}

#[macro_export]
#[cfg(not(debug_assertions))]
macro_rules! query {
    ( $self: ident, $type: ident, $collection: expr, $($rest:expr),+ ) => {
        $self.$type($collection, $($rest),+).await
            .map_err(|_| create_database_error!(stringify!($type), $collection))
    };
}

#[cfg(test)]
mod tests {
    use crate::ErrorType;

    #[test]
    fn use_macro_to_construct_error() {
        let error = create_error!(NotFound);
        assert!(matches!(error.error_type, ErrorType::NotFound));
    }

    #[test]
    fn use_macro_to_construct_complex_error() {
        let error = create_error!(InvalidInput {
            error: "title must not be empty".to_string()
        });
        assert!(matches!(error.error_type, ErrorType::InvalidInput { .. }));
    }

    #[test]
    fn compare_error_types_ignoring_data() {
        let error = create_error!(DatabaseError {
            operation: "insert".to_string(),
            collection: "posts".to_string()
        });

        assert!(error.is(&ErrorType::DatabaseError {
            operation: Default::default(),
            collection: Default::default()
        }));
        assert!(!error.is(&ErrorType::NotFound));
    }
}
