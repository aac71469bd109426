// Pet store API declarations used by the integration tests.

pub const OPENAPI_SPEC: &str = r#"
info:
  version: 1.0.0
  title: Swagger Petstore
  description: A sample API that uses a petstore as an example
  license:
    name: Apache 2.0
    url: https://www.apache.org/licenses/LICENSE-2.0.html
servers:
  - url: https://petstore.example.com/v1
"#;

pub const AUTH: &str = r#"
auth: basic
apiKey: header,X-XXX
oidc: oidc,https://example.com/.well-known/openid-configuration
oauth2:
  flow: authorizationCode
  authUrl: https://api.example.com/oauth2/authorize
  tokenUrl: https://api.example.com/oauth2/token
  refreshUrl: https://api.example.com/oauth2/refresh
  scopes:
    read_pets: read your pets
    write_pets: modify pets in your account
"#;

pub struct Error {
    pub code: i32,
    pub message: String,
}

pub struct NewPet {
    #[tag = "{min:1,max:64}"]
    pub name: String,
    #[tag = "{max:20,pattern:'^[a-z]+$'}"]
    pub tag: String,
}

pub struct Pet {
    #[serde(flatten)]
    pub new_pet: NewPet,
    #[tag = "{gt:0}"]
    pub id: i64,
}

pub trait PetStore {
    /// Returns all pets from the system that the user has access to
    ///
    /// (GET /pets)
    /// 200: pet response
    /// default: unexpected error
    fn find_pets(&self, params: FindPetsParams) -> Vec<Pet>;

    /// Creates a new pet in the store. Duplicates are allowed
    ///
    /// (POST /pets)
    /// 200: pet response
    /// default: unexpected error
    fn add_pet(&self, body: NewPet) -> Pet;

    /// deletes a single pet based on the ID supplied
    ///
    /// (DELETE /pets/{id})
    /// 204: pet deleted
    /// default: unexpected error
    fn delete_pet(&self, id: i64);

    /// Returns a pet based on a single ID
    ///
    /// (GET /pets/{id})
    /// 200: pet response
    /// default: unexpected error
    fn find_pet_by_id(&self, id: i64) -> Pet;
}

pub struct FindPetsParams {
    /// tags to filter by
    pub tags: Vec<String>,
    /// maximum number of results to return
    #[tag = "{min:1,max:100}"]
    pub limit: i32,
}
