/*!

This is the long-form manual for `vote_tabulation` and `votesys`.

## Tabulation methods

### `plurality`

Each ballot marks a single candidate. The candidates with the most votes fill the seats.
A ballot without any mark is not counted.

When several candidates share the highest number of votes, the tie is broken at random.
If there are more tied candidates than seats, a random subset of them wins. Otherwise,
all of them win and the remaining seats go to the next candidates by decreasing number
of votes.

### `stv`

Single transferable vote. Each ballot ranks some of the candidates. The count uses the
droop quota: `floor(ballots / (seats + 1)) + 1`.

Every round:
1. the ballots that are not held by a winner go to their most preferred running candidate.
   A candidate reaching the quota is declared a winner immediately and keeps its ballots.
2. the candidate with the fewest votes is eliminated, and its ballots go to their next
   running preference. A candidate reaching the quota during this transfer is also a winner.

The count stops when all the candidates but the number of seats have been eliminated. Seats
still open at that point go to the candidates still running.

When several candidates have the fewest votes, the candidate whose first ballot came last
in processing order is eliminated. Candidates without any ballot are eliminated first (the
last one in the list of candidates first). By default the ballots are shuffled before the
count, which makes this order random. Use `--no-shuffle` (or `"shuffleBallots": false`) to
count the ballots in file order, and `--seed` to make a shuffled count reproducible.

## Input formats

The following formats are supported:
* `csv` Comma Separated Values
* `xlsx` Excel spreadsheets

Both formats use the same layout: the first row lists the names of the candidates, and
every other row is a ballot.

### Plurality ballots

The chosen candidate is marked with `1`, every other cell is empty:

```text
A,B,C,D
1,,,
,,,1
,1,,
```

If a row has several marks, only the first one is counted.

### Ranked ballots

Each cell contains the rank of the candidate (`1` is the first choice), or is empty if the
candidate is not ranked:

```text
A,B,C
1,2,3
2,1,
,,1
```

Gaps in the ranks are skipped: ranks `1` and `3` make a ballot with two choices. Ranks must
be positive integers, anything else stops the tabulation with an error.

## Configuration

`votesys` can be driven from the command line only:

```text
votesys --input ballots.csv --method stv --seats 2 --report report.txt --out stdout
```

It also accepts a configuration file in JSON:

```json
{
  "outputSettings": {
    "contestName": "City council",
    "outputDirectory": "results",
    "contestDate": "2022-11-08",
    "contestJurisdiction": "Springfield",
    "contestOffice": "Council",
    "reportFile": "report.txt"
  },
  "cvrFileSources": [
    {"provider": "csv", "filePath": "ballots_1.csv"},
    {"provider": "xlsx", "filePath": "ballots_2.xlsx", "excelWorksheetName": "Sheet1"}
  ],
  "rules": {
    "tabulationMethod": "stv",
    "numberOfWinners": 2,
    "randomSeed": "42",
    "shuffleBallots": true,
    "generateReport": true
  }
}
```

File paths are relative to the directory of the configuration file. When `outputDirectory`
is set, the report and the summary are written in that directory, which is created if needed. All the ballot files
must list the same candidates in the same order. The flags of the command line take
precedence over the configuration file.

## Outputs

The winners and the dropped candidates are printed on the console, with their number of votes.

When the report is enabled, every step of the count is written to the report file:

```text
Ballot No. 1 is assigned to Candidate - A
---------------
Candidate - C has been dropped!
---------------
Candidate - A is a winner!
---------------
```

The ballot numbers are the positions of the ballots in the input files, starting at 1.

The summary (`--out`) is a JSON document with the configuration, the tally of each round,
the winners and the dropped candidates.

 */
